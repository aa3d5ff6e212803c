//! Plain-text renderings of API data for the terminal.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use super::guard::{menu, View};
use super::Session;
use crate::models::{
    MessageView, ProjectStatus, ProjectView, ReviewView, Role, UpdateView, UserView,
};

fn date(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

pub fn sidebar(session: &Session, active: View) -> String {
    let mut out = String::new();
    let heading = match session.role {
        Role::TeamLeader => "Team Leader",
        Role::Employee => "Employee",
    };
    let _ = writeln!(out, "[{}] {}", heading, session.name);
    for item in menu(session.role) {
        let marker = if item.view == active { ">" } else { " " };
        let _ = writeln!(out, " {} {}", marker, item.label);
    }
    out
}

pub fn project_list(projects: &[ProjectView]) -> String {
    if projects.is_empty() {
        return "No projects.\n".to_string();
    }
    let mut out = String::new();
    for p in projects {
        let assignee = p.assigned_to.as_ref().map(|u| u.fullname.as_str());
        let deadline = p.deadline.as_ref().map(|d| d.format("%Y-%m-%d").to_string());
        let _ = writeln!(
            out,
            "{}  {:<30} {:<12} assignee: {:<20} due: {}",
            p.id,
            p.title,
            p.status.as_str(),
            or_dash(assignee),
            or_dash(deadline.as_deref()),
        );
    }
    out
}

fn update_line(out: &mut String, update: &UpdateView, link: &dyn Fn(&str) -> String) {
    let sender = update.sender.as_ref().map(|u| u.fullname.as_str());
    let _ = writeln!(
        out,
        "  [{}] {} {} ({}): {}",
        update.status.as_str(),
        date(&update.created_at),
        or_dash(sender),
        update.id,
        update.message
    );
    if let Some(file) = &update.file {
        let _ = writeln!(out, "      file: {}", link(file));
    }
}

pub fn updates(updates: &[UpdateView], link: &dyn Fn(&str) -> String) -> String {
    let mut out = String::new();
    if updates.is_empty() {
        out.push_str("  No updates yet.\n");
    }
    for u in updates {
        update_line(&mut out, u, link);
    }
    out
}

pub fn reviews(reviews: &[ReviewView]) -> String {
    let mut out = String::new();
    if reviews.is_empty() {
        out.push_str("  No reviews yet.\n");
    }
    for r in reviews {
        let reviewer = r.reviewer.as_ref().map(|u| u.fullname.as_str());
        let _ = writeln!(
            out,
            "  {} {}: {}",
            date(&r.created_at),
            or_dash(reviewer),
            r.message
        );
    }
    out
}

/// A project with its update and review threads, newest first.
pub fn project_detail(project: &ProjectView, link: &dyn Fn(&str) -> String) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", project.title, project.id);
    let _ = writeln!(out, "status: {}", project.status.as_str());
    if let Some(description) = &project.description {
        let _ = writeln!(out, "{}", description);
    }
    let assignee = project.assigned_to.as_ref().map(|u| u.fullname.as_str());
    let _ = writeln!(out, "assigned to: {}", or_dash(assignee));
    out.push_str("updates:\n");
    out.push_str(&updates(&project.updates, link));
    out.push_str("reviews:\n");
    out.push_str(&reviews(&project.reviews));
    out
}

pub fn employee_roster(employees: &[UserView]) -> String {
    if employees.is_empty() {
        return "No employees.\n".to_string();
    }
    let mut out = String::new();
    for e in employees {
        let _ = writeln!(
            out,
            "{}  {:<24} {:<16} {:<28} {}",
            e.id,
            e.fullname,
            e.username,
            e.email,
            e.status.as_str()
        );
    }
    out
}

pub fn profile(user: &UserView) -> String {
    format!(
        "{}\n  username: {}\n  email: {}\n  role: {}\n  status: {}\n  since: {}\n",
        user.fullname,
        user.username,
        user.email,
        user.role,
        user.status.as_str(),
        date(&user.created_at)
    )
}

pub fn message_panel(title: &str, messages: &[MessageView]) -> String {
    let mut out = format!("== {} ==\n", title);
    if messages.is_empty() {
        out.push_str("No messages.\n");
    }
    for m in messages {
        let _ = writeln!(
            out,
            "{} {} ({}): {}",
            date(&m.created_at),
            m.sender_name,
            m.sender_role,
            m.message
        );
    }
    out
}

/// Counts per status for the role's dashboard.
pub fn dashboard(session: &Session, projects: &[ProjectView]) -> String {
    let count = |status: ProjectStatus| projects.iter().filter(|p| p.status == status).count();
    let heading = match session.role {
        Role::TeamLeader => "All projects",
        Role::Employee => "My projects",
    };
    format!(
        "Welcome, {}\n{}: {} (pending {}, in progress {}, completed {})\n",
        session.name,
        heading,
        projects.len(),
        count(ProjectStatus::Pending),
        count(ProjectStatus::InProgress),
        count(ProjectStatus::Completed),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UpdateStatus, UserSummary};

    fn leader() -> UserSummary {
        UserSummary {
            id: "l1".into(),
            fullname: "Lead One".into(),
            email: "lead1@x.com".into(),
            role: Role::TeamLeader,
        }
    }

    fn project(status: ProjectStatus) -> ProjectView {
        ProjectView {
            id: "p1".into(),
            title: "T1".into(),
            description: None,
            assigned_to: None,
            status,
            deadline: None,
            updates: vec![UpdateView {
                id: "u1".into(),
                sender: None,
                message: "done".into(),
                file: Some("1-abc.txt".into()),
                status: UpdateStatus::Pending,
                role: Role::Employee,
                created_at: Utc::now(),
            }],
            reviews: vec![ReviewView {
                id: "r1".into(),
                reviewer: Some(leader()),
                message: "nice".into(),
                created_at: Utc::now(),
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn detail_links_files_and_names_reviewers() {
        let text = project_detail(&project(ProjectStatus::Pending), &|f| format!("http://h/uploads/{}", f));
        assert!(text.contains("http://h/uploads/1-abc.txt"));
        assert!(text.contains("Lead One: nice"));
        assert!(text.contains("assigned to: -"));
    }

    #[test]
    fn dashboard_counts_statuses() {
        let session = Session {
            token: "t".into(),
            role: Role::Employee,
            name: "Emp One".into(),
            email: "emp1@x.com".into(),
        };
        let text = dashboard(
            &session,
            &[project(ProjectStatus::Pending), project(ProjectStatus::Completed)],
        );
        assert!(text.contains("My projects: 2 (pending 1, in progress 0, completed 1)"));
    }

    #[test]
    fn sidebar_marks_the_active_view() {
        let session = Session {
            token: "t".into(),
            role: Role::TeamLeader,
            name: "Lead One".into(),
            email: "lead1@x.com".into(),
        };
        let text = sidebar(&session, View::Projects);
        assert!(text.contains("> View Projects"));
        assert!(text.contains("  Employees List"));
    }
}

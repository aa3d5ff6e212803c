//! Client-side navigation rules. These only decide what the terminal shows;
//! the server enforces access on every request regardless.

use crate::models::Role;

use super::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Register,
    Home,
    TeamLeaderDashboard,
    EmployeeDashboard,
    Employees,
    Projects,
    MyTasks,
    Profile,
}

impl View {
    /// `None` for views anyone can open, otherwise the roles admitted.
    pub fn allowed_roles(self) -> Option<&'static [Role]> {
        const ANY: &[Role] = &[Role::Employee, Role::TeamLeader];
        const LEADER: &[Role] = &[Role::TeamLeader];
        const EMPLOYEE: &[Role] = &[Role::Employee];
        match self {
            View::Login | View::Register => None,
            View::Home => Some(ANY),
            View::TeamLeaderDashboard | View::Employees | View::Projects => Some(LEADER),
            View::EmployeeDashboard | View::MyTasks | View::Profile => Some(EMPLOYEE),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            View::Login => "Login",
            View::Register => "Register",
            View::Home => "Home",
            View::TeamLeaderDashboard => "Add Projects",
            View::EmployeeDashboard => "Dashboard",
            View::Employees => "Employees List",
            View::Projects => "View Projects",
            View::MyTasks => "My Tasks",
            View::Profile => "Profile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Render(View),
    Redirect(View),
}

/// Decides whether `view` may be shown for the given session.
pub fn guard(view: View, session: Option<&Session>) -> Guard {
    let Some(allowed) = view.allowed_roles() else {
        return Guard::Render(view);
    };
    match session {
        None => Guard::Redirect(View::Login),
        Some(s) if allowed.contains(&s.role) => Guard::Render(view),
        Some(_) => Guard::Redirect(View::Home),
    }
}

/// Where a fresh login lands.
pub fn landing(role: Role) -> View {
    match role {
        Role::TeamLeader => View::TeamLeaderDashboard,
        Role::Employee => View::EmployeeDashboard,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub view: View,
}

/// Sidebar entries for a role.
pub fn menu(role: Role) -> Vec<MenuItem> {
    let views: &[View] = match role {
        Role::TeamLeader => &[
            View::Home,
            View::TeamLeaderDashboard,
            View::Projects,
            View::Employees,
        ],
        Role::Employee => &[
            View::Home,
            View::EmployeeDashboard,
            View::MyTasks,
            View::Profile,
        ],
    };
    views
        .iter()
        .map(|&view| MenuItem {
            label: view.title(),
            view,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [View; 9] = [
        View::Login,
        View::Register,
        View::Home,
        View::TeamLeaderDashboard,
        View::EmployeeDashboard,
        View::Employees,
        View::Projects,
        View::MyTasks,
        View::Profile,
    ];

    fn session(role: Role) -> Session {
        Session {
            token: "t".into(),
            role,
            name: "n".into(),
            email: "e@x.com".into(),
        }
    }

    #[test]
    fn no_session_redirects_every_protected_view_to_login() {
        for view in ALL {
            let expected = match view {
                View::Login | View::Register => Guard::Render(view),
                _ => Guard::Redirect(View::Login),
            };
            assert_eq!(guard(view, None), expected, "{:?}", view);
        }
    }

    #[test]
    fn wrong_role_goes_home() {
        let emp = session(Role::Employee);
        assert_eq!(guard(View::Employees, Some(&emp)), Guard::Redirect(View::Home));
        assert_eq!(guard(View::MyTasks, Some(&emp)), Guard::Render(View::MyTasks));

        let lead = session(Role::TeamLeader);
        assert_eq!(guard(View::Profile, Some(&lead)), Guard::Redirect(View::Home));
        assert_eq!(guard(View::Projects, Some(&lead)), Guard::Render(View::Projects));
    }

    #[test]
    fn every_menu_entry_is_reachable_for_its_role() {
        for role in [Role::Employee, Role::TeamLeader] {
            let s = session(role);
            let items = menu(role);
            assert_eq!(items[0].view, View::Home);
            assert!(items.iter().any(|i| i.view == landing(role)));
            for item in items {
                assert_eq!(guard(item.view, Some(&s)), Guard::Render(item.view));
            }
        }
    }
}

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::user::{Role, User, UserSummary};
use super::{normalize_token, string_enum_serde, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::InProgress => "in progress",
            ProjectStatus::Completed => "completed",
        }
    }

    /// Completed goes back to pending; anything still open is closed.
    pub fn toggled(self) -> Self {
        match self {
            ProjectStatus::Completed => ProjectStatus::Pending,
            ProjectStatus::Pending | ProjectStatus::InProgress => ProjectStatus::Completed,
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "pending" => Ok(ProjectStatus::Pending),
            "in progress" | "inprogress" => Ok(ProjectStatus::InProgress),
            "completed" => Ok(ProjectStatus::Completed),
            _ => Err(UnknownVariant {
                kind: "project status",
                value: s.to_string(),
            }),
        }
    }
}

/// Review state of an employee update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl UpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStatus::Pending => "pending",
            UpdateStatus::InProgress => "in progress",
            UpdateStatus::Completed => "completed",
            UpdateStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for UpdateStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "pending" => Ok(UpdateStatus::Pending),
            "in progress" | "inprogress" => Ok(UpdateStatus::InProgress),
            "completed" | "approved" => Ok(UpdateStatus::Completed),
            "rejected" => Ok(UpdateStatus::Rejected),
            _ => Err(UnknownVariant {
                kind: "update status",
                value: s.to_string(),
            }),
        }
    }
}

string_enum_serde!(ProjectStatus, UpdateStatus);

/// Progress entry shared by the assigned employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub sender: ObjectId,
    #[serde(default)]
    pub message: String,
    pub file: Option<String>,
    #[serde(default)]
    pub status: UpdateStatus,
    /// Role of the sender at the time the update was shared.
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl ProjectUpdate {
    pub fn new(sender: ObjectId, role: Role, message: String, file: Option<String>) -> Self {
        Self {
            id: ObjectId::new(),
            sender,
            message,
            file,
            status: UpdateStatus::Pending,
            role,
            created_at: Utc::now(),
        }
    }
}

/// Team leader comment on a project. Never edited after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub reviewer: ObjectId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(reviewer: ObjectId, message: String) -> Self {
        Self {
            id: ObjectId::new(),
            reviewer,
            message,
            created_at: Utc::now(),
        }
    }
}

/// A project document. Updates and reviews are embedded and addressed by
/// their own ObjectId.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<ObjectId>,
    #[serde(default)]
    pub status: ProjectStatus,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updates: Vec<ProjectUpdate>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(
        title: String,
        description: Option<String>,
        assigned_to: Option<ObjectId>,
        status: ProjectStatus,
        deadline: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            title,
            description,
            assigned_to,
            status,
            deadline,
            updates: Vec::new(),
            reviews: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Newest entries live at the front.
    pub fn push_update(&mut self, update: ProjectUpdate) {
        self.updates.insert(0, update);
        self.updated_at = Utc::now();
    }

    pub fn push_review(&mut self, review: Review) {
        self.reviews.insert(0, review);
        self.updated_at = Utc::now();
    }

    pub fn find_update(&self, update_id: &ObjectId) -> Option<&ProjectUpdate> {
        self.updates.iter().find(|u| &u.id == update_id)
    }

    /// Sets the status of one embedded update. Returns false when the id is
    /// unknown.
    pub fn set_update_status(&mut self, update_id: &ObjectId, status: UpdateStatus) -> bool {
        match self.updates.iter_mut().find(|u| &u.id == update_id) {
            Some(update) => {
                update.status = status;
                true
            }
            None => false,
        }
    }

    pub fn updates_newest_first(&self) -> Vec<&ProjectUpdate> {
        let mut updates: Vec<&ProjectUpdate> = self.updates.iter().collect();
        updates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        updates
    }

    pub fn reviews_newest_first(&self) -> Vec<&Review> {
        let mut reviews: Vec<&Review> = self.reviews.iter().collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reviews
    }

    /// Every user id this project points at, deduplicated.
    pub fn referenced_users(&self) -> Vec<ObjectId> {
        let mut ids = BTreeSet::new();
        if let Some(assignee) = self.assigned_to {
            ids.insert(assignee);
        }
        ids.extend(self.updates.iter().map(|u| u.sender));
        ids.extend(self.reviews.iter().map(|r| r.reviewer));
        ids.into_iter().collect()
    }
}

/// Partial update of project metadata.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    /// `Some(None)` clears the deadline.
    pub deadline: Option<Option<DateTime<Utc>>>,
    /// `Some(None)` unassigns the project.
    pub assigned_to: Option<Option<ObjectId>>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.deadline.is_none()
            && self.assigned_to.is_none()
    }

    pub fn apply(&self, project: &mut Project) {
        if let Some(title) = &self.title {
            project.title = title.clone();
        }
        if let Some(description) = &self.description {
            project.description = Some(description.clone());
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(deadline) = self.deadline {
            project.deadline = deadline;
        }
        if let Some(assigned_to) = self.assigned_to {
            project.assigned_to = assigned_to;
        }
        project.updated_at = Utc::now();
    }
}

pub type UserIndex = HashMap<ObjectId, User>;

fn summary(users: &UserIndex, id: &ObjectId) -> Option<UserSummary> {
    users.get(id).map(UserSummary::from)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateView {
    pub id: String,
    pub sender: Option<UserSummary>,
    pub message: String,
    pub file: Option<String>,
    pub status: UpdateStatus,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UpdateView {
    pub fn build(update: &ProjectUpdate, users: &UserIndex) -> Self {
        Self {
            id: update.id.to_hex(),
            sender: summary(users, &update.sender),
            message: update.message.clone(),
            file: update.file.clone(),
            status: update.status,
            role: update.role,
            created_at: update.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: String,
    pub reviewer: Option<UserSummary>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ReviewView {
    pub fn build(review: &Review, users: &UserIndex) -> Self {
        Self {
            id: review.id.to_hex(),
            reviewer: summary(users, &review.reviewer),
            message: review.message.clone(),
            created_at: review.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<UserSummary>,
    pub status: ProjectStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub updates: Vec<UpdateView>,
    pub reviews: Vec<ReviewView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectView {
    pub fn build(project: &Project, users: &UserIndex) -> Self {
        Self {
            id: project.id.to_hex(),
            title: project.title.clone(),
            description: project.description.clone(),
            assigned_to: project.assigned_to.and_then(|id| summary(users, &id)),
            status: project.status,
            deadline: project.deadline,
            updates: project
                .updates_newest_first()
                .into_iter()
                .map(|u| UpdateView::build(u, users))
                .collect(),
            reviews: project
                .reviews_newest_first()
                .into_iter()
                .map(|r| ReviewView::build(r, users))
                .collect(),
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

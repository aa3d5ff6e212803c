//! Persistence seams. Handlers only talk to these traits; `MongoDB` backs them
//! in production and `MemoryStore` in tests and local runs.

pub mod memory;
pub mod mongo;

use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::models::{
    Message, Project, ProjectPatch, ProjectStatus, ProjectUpdate, Review, Role, UpdateStatus,
    User, UserPatch,
};

pub use memory::MemoryStore;
pub use mongo::MongoDB;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field (email or username) collided with an existing record.
    #[error("duplicate {0}")]
    Duplicate(String),

    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("bson serialization: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Credential store.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Any user holding this email or this username.
    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> StoreResult<Option<User>>;
    async fn find_users(&self, ids: &[ObjectId]) -> StoreResult<Vec<User>>;
    /// Users with the given role, newest first.
    async fn list_users(&self, role: Role) -> StoreResult<Vec<User>>;
    async fn update_user(&self, id: &ObjectId, patch: &UserPatch) -> StoreResult<Option<User>>;
    async fn delete_user(&self, id: &ObjectId) -> StoreResult<bool>;
}

/// Project store. Updates and reviews live inside the project document, so
/// every mutation here touches exactly one document.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn insert_project(&self, project: &Project) -> StoreResult<()>;
    async fn find_project(&self, id: &ObjectId) -> StoreResult<Option<Project>>;
    /// All projects, or only those assigned to `assignee`, newest first.
    async fn list_projects(&self, assignee: Option<&ObjectId>) -> StoreResult<Vec<Project>>;
    async fn update_project(
        &self,
        id: &ObjectId,
        patch: &ProjectPatch,
    ) -> StoreResult<Option<Project>>;
    async fn set_project_status(
        &self,
        id: &ObjectId,
        status: ProjectStatus,
    ) -> StoreResult<Option<Project>>;
    async fn delete_project(&self, id: &ObjectId) -> StoreResult<bool>;
    async fn push_update(
        &self,
        project_id: &ObjectId,
        update: &ProjectUpdate,
    ) -> StoreResult<Option<Project>>;
    /// Returns false when the project or the update does not exist.
    async fn set_update_status(
        &self,
        project_id: &ObjectId,
        update_id: &ObjectId,
        status: UpdateStatus,
    ) -> StoreResult<bool>;
    async fn push_review(
        &self,
        project_id: &ObjectId,
        review: &Review,
    ) -> StoreResult<Option<Project>>;
}

/// Message store. Listings are oldest first.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(&self, message: &Message) -> StoreResult<()>;
    async fn list_broadcast(&self) -> StoreResult<Vec<Message>>;
    async fn list_thread(&self, a: &ObjectId, b: &ObjectId) -> StoreResult<Vec<Message>>;
}

/// Loads the users behind `ids` keyed by id, for display resolution.
pub async fn user_index(
    users: &dyn UserStore,
    ids: &[ObjectId],
) -> StoreResult<HashMap<ObjectId, User>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let found = users.find_users(ids).await?;
    Ok(found.into_iter().map(|u| (u.id, u)).collect())
}

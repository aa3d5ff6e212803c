use std::sync::RwLock;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use super::{MessageStore, ProjectStore, StoreError, StoreResult, UserStore};
use crate::models::{
    Message, Project, ProjectPatch, ProjectStatus, ProjectUpdate, Review, Role, UpdateStatus,
    User, UserPatch,
};

/// In-process store with the same observable behaviour as the MongoDB
/// backend, including unique email/username enforcement.
///
/// Records are kept in insertion order; locks are never held across an await.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    projects: RwLock<Vec<Project>>,
    messages: RwLock<Vec<Message>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate_field(existing: &User, email: &str, username: &str) -> Option<&'static str> {
    if existing.email == email {
        Some("email")
    } else if existing.username == username {
        Some("username")
    } else {
        None
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        if let Some(field) = users
            .iter()
            .find_map(|u| duplicate_field(u, &user.email, &user.username))
        {
            return Err(StoreError::Duplicate(field.to_string()));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users.iter().find(|u| &u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> StoreResult<Option<User>> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users
            .iter()
            .find(|u| u.email == email || u.username == username)
            .cloned())
    }

    async fn find_users(&self, ids: &[ObjectId]) -> StoreResult<Vec<User>> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    async fn list_users(&self, role: Role) -> StoreResult<Vec<User>> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users.iter().rev().filter(|u| u.role == role).cloned().collect())
    }

    async fn update_user(&self, id: &ObjectId, patch: &UserPatch) -> StoreResult<Option<User>> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        let email = patch.email.as_deref().unwrap_or_default();
        let username = patch.username.as_deref().unwrap_or_default();
        if let Some(field) = users
            .iter()
            .filter(|u| &u.id != id)
            .find_map(|u| duplicate_field(u, email, username))
        {
            return Err(StoreError::Duplicate(field.to_string()));
        }
        Ok(users.iter_mut().find(|u| &u.id == id).map(|user| {
            patch.apply(user);
            user.clone()
        }))
    }

    async fn delete_user(&self, id: &ObjectId) -> StoreResult<bool> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        let before = users.len();
        users.retain(|u| &u.id != id);
        Ok(users.len() != before)
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn insert_project(&self, project: &Project) -> StoreResult<()> {
        let mut projects = self.projects.write().map_err(|_| StoreError::Poisoned)?;
        projects.push(project.clone());
        Ok(())
    }

    async fn find_project(&self, id: &ObjectId) -> StoreResult<Option<Project>> {
        let projects = self.projects.read().map_err(|_| StoreError::Poisoned)?;
        Ok(projects.iter().find(|p| &p.id == id).cloned())
    }

    async fn list_projects(&self, assignee: Option<&ObjectId>) -> StoreResult<Vec<Project>> {
        let projects = self.projects.read().map_err(|_| StoreError::Poisoned)?;
        Ok(projects
            .iter()
            .rev()
            .filter(|p| match assignee {
                Some(id) => p.assigned_to.as_ref() == Some(id),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn update_project(
        &self,
        id: &ObjectId,
        patch: &ProjectPatch,
    ) -> StoreResult<Option<Project>> {
        let mut projects = self.projects.write().map_err(|_| StoreError::Poisoned)?;
        Ok(projects.iter_mut().find(|p| &p.id == id).map(|project| {
            patch.apply(project);
            project.clone()
        }))
    }

    async fn set_project_status(
        &self,
        id: &ObjectId,
        status: ProjectStatus,
    ) -> StoreResult<Option<Project>> {
        let patch = ProjectPatch {
            status: Some(status),
            ..Default::default()
        };
        self.update_project(id, &patch).await
    }

    async fn delete_project(&self, id: &ObjectId) -> StoreResult<bool> {
        let mut projects = self.projects.write().map_err(|_| StoreError::Poisoned)?;
        let before = projects.len();
        projects.retain(|p| &p.id != id);
        Ok(projects.len() != before)
    }

    async fn push_update(
        &self,
        project_id: &ObjectId,
        update: &ProjectUpdate,
    ) -> StoreResult<Option<Project>> {
        let mut projects = self.projects.write().map_err(|_| StoreError::Poisoned)?;
        Ok(projects.iter_mut().find(|p| &p.id == project_id).map(|project| {
            project.push_update(update.clone());
            project.clone()
        }))
    }

    async fn set_update_status(
        &self,
        project_id: &ObjectId,
        update_id: &ObjectId,
        status: UpdateStatus,
    ) -> StoreResult<bool> {
        let mut projects = self.projects.write().map_err(|_| StoreError::Poisoned)?;
        Ok(projects
            .iter_mut()
            .find(|p| &p.id == project_id)
            .map(|project| project.set_update_status(update_id, status))
            .unwrap_or(false))
    }

    async fn push_review(
        &self,
        project_id: &ObjectId,
        review: &Review,
    ) -> StoreResult<Option<Project>> {
        let mut projects = self.projects.write().map_err(|_| StoreError::Poisoned)?;
        Ok(projects.iter_mut().find(|p| &p.id == project_id).map(|project| {
            project.push_review(review.clone());
            project.clone()
        }))
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        let mut messages = self.messages.write().map_err(|_| StoreError::Poisoned)?;
        messages.push(message.clone());
        Ok(())
    }

    async fn list_broadcast(&self) -> StoreResult<Vec<Message>> {
        let messages = self.messages.read().map_err(|_| StoreError::Poisoned)?;
        Ok(messages.iter().filter(|m| m.is_broadcast()).cloned().collect())
    }

    async fn list_thread(&self, a: &ObjectId, b: &ObjectId) -> StoreResult<Vec<Message>> {
        let messages = self.messages.read().map_err(|_| StoreError::Poisoned)?;
        Ok(messages.iter().filter(|m| m.is_between(a, b)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserStatus;

    fn user(name: &str, role: Role) -> User {
        User::new(
            name.to_string(),
            name.to_string(),
            format!("{}@x.com", name),
            "hash".to_string(),
            role,
            UserStatus::Active,
        )
    }

    #[tokio::test]
    async fn duplicate_email_or_username_is_rejected() {
        let store = MemoryStore::new();
        store.insert_user(&user("ann", Role::Employee)).await.unwrap();

        let mut same_email = user("bob", Role::Employee);
        same_email.email = "ann@x.com".into();
        assert!(matches!(
            store.insert_user(&same_email).await,
            Err(StoreError::Duplicate(f)) if f == "email"
        ));

        let mut same_username = user("carl", Role::Employee);
        same_username.username = "ann".into();
        assert!(matches!(
            store.insert_user(&same_username).await,
            Err(StoreError::Duplicate(f)) if f == "username"
        ));
        assert_eq!(store.list_users(Role::Employee).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_users_filters_by_role_newest_first() {
        let store = MemoryStore::new();
        store.insert_user(&user("a", Role::Employee)).await.unwrap();
        store.insert_user(&user("lead", Role::TeamLeader)).await.unwrap();
        store.insert_user(&user("b", Role::Employee)).await.unwrap();

        let names: Vec<String> = store
            .list_users(Role::Employee)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn update_status_requires_both_ids() {
        let store = MemoryStore::new();
        let project = Project::new("P".into(), None, None, ProjectStatus::Pending, None);
        store.insert_project(&project).await.unwrap();
        let update = ProjectUpdate::new(ObjectId::new(), Role::Employee, "x".into(), None);
        store.push_update(&project.id, &update).await.unwrap();

        assert!(store
            .set_update_status(&project.id, &update.id, UpdateStatus::Rejected)
            .await
            .unwrap());
        assert!(!store
            .set_update_status(&project.id, &ObjectId::new(), UpdateStatus::Rejected)
            .await
            .unwrap());
        assert!(!store
            .set_update_status(&ObjectId::new(), &update.id, UpdateStatus::Rejected)
            .await
            .unwrap());
    }
}

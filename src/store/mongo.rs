use async_trait::async_trait;
use futures::stream::TryStreamExt;
use log::info;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};

use super::{MessageStore, ProjectStore, StoreError, StoreResult, UserStore};
use crate::models::{
    Message, Project, ProjectPatch, ProjectStatus, ProjectUpdate, Review, Role, UpdateStatus,
    User, UserPatch,
};

const USERS: &str = "users";
const PROJECTS: &str = "projects";
const MESSAGES: &str = "messages";

/// MongoDB error code for unique index violations.
const DUPLICATE_KEY: i32 = 11000;

pub struct MongoDB {
    pub client: Client,
    pub db: Database,
}

impl MongoDB {
    pub async fn init(uri: &str, db_name: &str) -> StoreResult<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        let mongodb = MongoDB { client, db };
        mongodb.ensure_indexes().await?;
        info!("Connected to MongoDB database {}", db_name);
        Ok(mongodb)
    }

    /// Email and username are unique across all users.
    async fn ensure_indexes(&self) -> StoreResult<()> {
        for field in ["email", "username"] {
            let mut keys = Document::new();
            keys.insert(field, 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.users().create_index(index).await?;
        }
        Ok(())
    }

    fn users(&self) -> Collection<User> {
        self.db.collection::<User>(USERS)
    }

    fn projects(&self) -> Collection<Project> {
        self.db.collection::<Project>(PROJECTS)
    }

    fn messages(&self) -> Collection<Message> {
        self.db.collection::<Message>(MESSAGES)
    }
}

fn duplicate_key(err: &mongodb::error::Error) -> bool {
    // find_one_and_update reports it as a command error, inserts as a write error.
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Names the unique field a duplicate-key error complains about.
fn duplicate_field(err: &mongodb::error::Error) -> String {
    if err.to_string().contains("username") {
        "username".to_string()
    } else {
        "email".to_string()
    }
}

fn map_write_error(err: mongodb::error::Error) -> StoreError {
    if duplicate_key(&err) {
        StoreError::Duplicate(duplicate_field(&err))
    } else {
        StoreError::Mongo(err)
    }
}

fn user_set_doc(patch: &UserPatch) -> StoreResult<Document> {
    let mut set_doc = doc! {};
    if let Some(fullname) = &patch.fullname {
        set_doc.insert("fullname", fullname.clone());
    }
    if let Some(username) = &patch.username {
        set_doc.insert("username", username.clone());
    }
    if let Some(email) = &patch.email {
        set_doc.insert("email", email.clone());
    }
    if let Some(role) = &patch.role {
        set_doc.insert("role", role.as_str());
    }
    if let Some(status) = &patch.status {
        set_doc.insert("status", status.as_str());
    }
    set_doc.insert("updated_at", to_bson(&chrono::Utc::now())?);
    Ok(set_doc)
}

fn project_set_doc(patch: &ProjectPatch) -> StoreResult<Document> {
    let mut set_doc = doc! {};
    if let Some(title) = &patch.title {
        set_doc.insert("title", title.clone());
    }
    if let Some(description) = &patch.description {
        set_doc.insert("description", description.clone());
    }
    if let Some(status) = &patch.status {
        set_doc.insert("status", status.as_str());
    }
    if let Some(deadline) = &patch.deadline {
        set_doc.insert("deadline", to_bson(deadline)?);
    }
    if let Some(assigned_to) = &patch.assigned_to {
        set_doc.insert("assigned_to", to_bson(assigned_to)?);
    }
    set_doc.insert("updated_at", to_bson(&chrono::Utc::now())?);
    Ok(set_doc)
}

#[async_trait]
impl UserStore for MongoDB {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.users()
            .insert_one(user)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "_id": *id }).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "email": email }).await?)
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> StoreResult<Option<User>> {
        let filter = doc! { "$or": [ { "email": email }, { "username": username } ] };
        Ok(self.users().find_one(filter).await?)
    }

    async fn find_users(&self, ids: &[ObjectId]) -> StoreResult<Vec<User>> {
        let cursor = self.users().find(doc! { "_id": { "$in": ids.to_vec() } }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_users(&self, role: Role) -> StoreResult<Vec<User>> {
        // ObjectIds grow with creation time, so _id order is creation order.
        let cursor = self
            .users()
            .find(doc! { "role": role.as_str() })
            .sort(doc! { "_id": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_user(&self, id: &ObjectId, patch: &UserPatch) -> StoreResult<Option<User>> {
        let set_doc = user_set_doc(patch)?;
        self.users()
            .find_one_and_update(doc! { "_id": *id }, doc! { "$set": set_doc })
            .return_document(ReturnDocument::After)
            .await
            .map_err(map_write_error)
    }

    async fn delete_user(&self, id: &ObjectId) -> StoreResult<bool> {
        let res = self.users().delete_one(doc! { "_id": *id }).await?;
        Ok(res.deleted_count == 1)
    }
}

#[async_trait]
impl ProjectStore for MongoDB {
    async fn insert_project(&self, project: &Project) -> StoreResult<()> {
        self.projects().insert_one(project).await?;
        Ok(())
    }

    async fn find_project(&self, id: &ObjectId) -> StoreResult<Option<Project>> {
        Ok(self.projects().find_one(doc! { "_id": *id }).await?)
    }

    async fn list_projects(&self, assignee: Option<&ObjectId>) -> StoreResult<Vec<Project>> {
        let filter = match assignee {
            Some(id) => doc! { "assigned_to": *id },
            None => doc! {},
        };
        let cursor = self
            .projects()
            .find(filter)
            .sort(doc! { "_id": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_project(
        &self,
        id: &ObjectId,
        patch: &ProjectPatch,
    ) -> StoreResult<Option<Project>> {
        let set_doc = project_set_doc(patch)?;
        Ok(self
            .projects()
            .find_one_and_update(doc! { "_id": *id }, doc! { "$set": set_doc })
            .return_document(ReturnDocument::After)
            .await?)
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
        let res = self.projects().delete_one(doc! { "_id": *id }).await?;
        Ok(res.deleted_count == 1)
    }

    async fn push_update(
        &self,
        project_id: &ObjectId,
        update: &ProjectUpdate,
    ) -> StoreResult<Option<Project>> {
        let update_doc = doc! {
            "$push": { "updates": { "$each": [to_bson(update)?], "$position": 0 } },
            "$set": { "updated_at": to_bson(&chrono::Utc::now())? },
        };
        Ok(self
            .projects()
            .find_one_and_update(doc! { "_id": *project_id }, update_doc)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn set_update_status(
        &self,
        project_id: &ObjectId,
        update_id: &ObjectId,
        status: UpdateStatus,
    ) -> StoreResult<bool> {
        let res = self
            .projects()
            .update_one(
                doc! { "_id": *project_id, "updates._id": *update_id },
                doc! { "$set": { "updates.$.status": status.as_str() } },
            )
            .await?;
        Ok(res.matched_count == 1)
    }

    async fn push_review(
        &self,
        project_id: &ObjectId,
        review: &Review,
    ) -> StoreResult<Option<Project>> {
        let update_doc = doc! {
            "$push": { "reviews": { "$each": [to_bson(review)?], "$position": 0 } },
            "$set": { "updated_at": to_bson(&chrono::Utc::now())? },
        };
        Ok(self
            .projects()
            .find_one_and_update(doc! { "_id": *project_id }, update_doc)
            .return_document(ReturnDocument::After)
            .await?)
    }
}

#[async_trait]
impl MessageStore for MongoDB {
    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        self.messages().insert_one(message).await?;
        Ok(())
    }

    async fn list_broadcast(&self) -> StoreResult<Vec<Message>> {
        let cursor = self
            .messages()
            .find(doc! { "recipient": null })
            .sort(doc! { "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_thread(&self, a: &ObjectId, b: &ObjectId) -> StoreResult<Vec<Message>> {
        let filter = doc! {
            "$or": [
                { "sender": *a, "recipient": *b },
                { "sender": *b, "recipient": *a },
            ]
        };
        let cursor = self
            .messages()
            .find(filter)
            .sort(doc! { "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_patch_only_sets_supplied_fields() {
        let patch = ProjectPatch {
            title: Some("Renamed".into()),
            assigned_to: Some(None),
            ..Default::default()
        };
        let set_doc = project_set_doc(&patch).unwrap();
        assert_eq!(set_doc.get_str("title").unwrap(), "Renamed");
        assert!(set_doc.get("assigned_to").unwrap().as_null().is_some());
        assert!(set_doc.get("status").is_none());
        assert!(set_doc.contains_key("updated_at"));
    }

    #[test]
    fn user_patch_writes_enum_spellings() {
        let patch = UserPatch {
            role: Some(Role::TeamLeader),
            ..Default::default()
        };
        let set_doc = user_set_doc(&patch).unwrap();
        assert_eq!(set_doc.get_str("role").unwrap(), "teamleader");
        assert!(set_doc.get("email").is_none());
    }
}

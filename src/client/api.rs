//! Typed HTTP client for the tracker API.

use std::path::Path;

use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;

use super::{ClientError, Session};
use crate::models::{MessageView, ProjectView, ReviewView, Role, UpdateView, UserView};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub message: String,
    pub role: Role,
    pub name: String,
    pub email: String,
}

impl From<LoginResponse> for Session {
    fn from(r: LoginResponse) -> Self {
        Session {
            token: r.token,
            role: r.role,
            name: r.name,
            email: r.email,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Acknowledged {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserEnvelope {
    #[serde(default)]
    pub message: Option<String>,
    pub user: UserView,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatedEmployee {
    pub message: String,
    pub updated: UserView,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectsEnvelope {
    projects: Vec<ProjectView>,
}

#[derive(Debug, Clone, Deserialize)]
struct UpdatesEnvelope {
    updates: Vec<UpdateView>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReviewsEnvelope {
    reviews: Vec<ReviewView>,
}

#[derive(Debug, Clone, Deserialize)]
struct MessagesEnvelope {
    messages: Vec<MessageView>,
}

#[derive(Debug, Clone, Deserialize)]
struct SentEnvelope {
    message: MessageView,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Registration {
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewEmployee {
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EmployeeChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

/// `Some(None)` on the double options sends an explicit `null`, clearing
/// the field on the server.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Option<String>>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Client for whatever session the receiver holds right now.
    pub fn for_session(base_url: &str, session: &watch::Receiver<Option<Session>>) -> Self {
        let token = session.borrow().as_ref().map(|s| s.token.clone());
        Self::new(base_url, token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Link to a shared file. Uploads are served beside the API root, not
    /// under it.
    pub fn upload_url(&self, file: &str) -> String {
        let root = self.base_url.strip_suffix("/api").unwrap_or(&self.base_url);
        format!("{}/uploads/{}", root, file)
    }

    /// Request without credentials, for the sign-in routes.
    fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        self.http.request(method, url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.anonymous(method, path);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.message)
                .unwrap_or_else(|_| match status.canonical_reason() {
                    Some(reason) => format!("HTTP {} {}", status.as_u16(), reason),
                    None => format!("HTTP {}", status.as_u16()),
                });
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }

    // AUTH

    pub async fn register(&self, registration: &Registration) -> Result<UserEnvelope, ClientError> {
        self.send(self.anonymous(Method::POST, "/auth/register").json(registration))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = json!({ "email": email, "password": password });
        self.send(self.anonymous(Method::POST, "/auth/login").json(&body))
            .await
    }

    pub async fn me(&self) -> Result<UserView, ClientError> {
        let envelope: UserEnvelope = self.send(self.request(Method::GET, "/auth/me")).await?;
        Ok(envelope.user)
    }

    // EMPLOYEES

    pub async fn list_employees(&self) -> Result<Vec<UserView>, ClientError> {
        self.send(self.request(Method::GET, "/employees")).await
    }

    pub async fn my_profile(&self) -> Result<UserView, ClientError> {
        self.send(self.request(Method::GET, "/employees/me")).await
    }

    pub async fn get_employee(&self, id: &str) -> Result<UserView, ClientError> {
        self.send(self.request(Method::GET, &format!("/employees/{}", id)))
            .await
    }

    pub async fn create_employee(&self, employee: &NewEmployee) -> Result<UserEnvelope, ClientError> {
        self.send(self.request(Method::POST, "/employees").json(employee))
            .await
    }

    pub async fn update_employee(
        &self,
        id: &str,
        changes: &EmployeeChanges,
    ) -> Result<UpdatedEmployee, ClientError> {
        self.send(
            self.request(Method::PUT, &format!("/employees/{}", id))
                .json(changes),
        )
        .await
    }

    pub async fn delete_employee(&self, id: &str) -> Result<Acknowledged, ClientError> {
        self.send(self.request(Method::DELETE, &format!("/employees/{}", id)))
            .await
    }

    // PROJECTS

    pub async fn list_projects(&self) -> Result<Vec<ProjectView>, ClientError> {
        self.send(self.request(Method::GET, "/projects")).await
    }

    pub async fn my_projects(&self) -> Result<Vec<ProjectView>, ClientError> {
        let envelope: ProjectsEnvelope = self
            .send(self.request(Method::GET, "/projects/my-projects"))
            .await?;
        Ok(envelope.projects)
    }

    pub async fn get_project(&self, id: &str) -> Result<ProjectView, ClientError> {
        self.send(self.request(Method::GET, &format!("/projects/{}", id)))
            .await
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<ProjectView, ClientError> {
        self.send(self.request(Method::POST, "/projects").json(project))
            .await
    }

    pub async fn update_project(
        &self,
        id: &str,
        changes: &ProjectChanges,
    ) -> Result<ProjectView, ClientError> {
        self.send(
            self.request(Method::PUT, &format!("/projects/{}", id))
                .json(changes),
        )
        .await
    }

    pub async fn toggle_status(&self, id: &str) -> Result<ProjectView, ClientError> {
        self.send(self.request(Method::PATCH, &format!("/projects/{}/toggle-status", id)))
            .await
    }

    pub async fn delete_project(&self, id: &str) -> Result<Acknowledged, ClientError> {
        self.send(self.request(Method::DELETE, &format!("/projects/{}", id)))
            .await
    }

    // UPDATES & REVIEWS

    /// Shares an update; with a file the body goes out as multipart.
    pub async fn share_update(
        &self,
        project_id: &str,
        message: &str,
        file: Option<&Path>,
    ) -> Result<Vec<UpdateView>, ClientError> {
        let path = format!("/projects/{}/share", project_id);
        let builder = match file {
            Some(file) => {
                let bytes = tokio::fs::read(file).await?;
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload".to_string());
                let form = Form::new()
                    .text("message", message.to_string())
                    .part("file", Part::bytes(bytes).file_name(name));
                self.request(Method::POST, &path).multipart(form)
            }
            None => self
                .request(Method::POST, &path)
                .json(&json!({ "message": message })),
        };
        let envelope: UpdatesEnvelope = self.send(builder).await?;
        Ok(envelope.updates)
    }

    pub async fn list_updates(&self, project_id: &str) -> Result<Vec<UpdateView>, ClientError> {
        let envelope: UpdatesEnvelope = self
            .send(self.request(Method::GET, &format!("/projects/{}/updates", project_id)))
            .await?;
        Ok(envelope.updates)
    }

    pub async fn set_update_status(
        &self,
        project_id: &str,
        update_id: &str,
        status: &str,
    ) -> Result<Vec<UpdateView>, ClientError> {
        let envelope: UpdatesEnvelope = self
            .send(
                self.request(
                    Method::PUT,
                    &format!("/projects/{}/updates/{}", project_id, update_id),
                )
                .json(&json!({ "status": status })),
            )
            .await?;
        Ok(envelope.updates)
    }

    pub async fn add_review(
        &self,
        project_id: &str,
        message: &str,
    ) -> Result<Vec<ReviewView>, ClientError> {
        let envelope: ReviewsEnvelope = self
            .send(
                self.request(Method::POST, &format!("/projects/{}/review", project_id))
                    .json(&json!({ "message": message })),
            )
            .await?;
        Ok(envelope.reviews)
    }

    pub async fn list_reviews(&self, project_id: &str) -> Result<Vec<ReviewView>, ClientError> {
        let envelope: ReviewsEnvelope = self
            .send(self.request(Method::GET, &format!("/projects/{}/reviews", project_id)))
            .await?;
        Ok(envelope.reviews)
    }

    // MESSAGES

    /// `recipient` of `None` broadcasts.
    pub async fn send_message(
        &self,
        message: &str,
        recipient: Option<&str>,
    ) -> Result<MessageView, ClientError> {
        let body = json!({ "message": message, "recipientId": recipient });
        let envelope: SentEnvelope = self
            .send(self.request(Method::POST, "/messages/send").json(&body))
            .await?;
        Ok(envelope.message)
    }

    pub async fn broadcast_messages(&self) -> Result<Vec<MessageView>, ClientError> {
        let envelope: MessagesEnvelope = self
            .send(self.request(Method::GET, "/messages/broadcast"))
            .await?;
        Ok(envelope.messages)
    }

    pub async fn thread_messages(&self, employee_id: &str) -> Result<Vec<MessageView>, ClientError> {
        let envelope: MessagesEnvelope = self
            .send(self.request(Method::GET, &format!("/messages/employee/{}", employee_id)))
            .await?;
        Ok(envelope.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MemoryStorage, SessionContext, DEFAULT_API_URL};

    #[test]
    fn upload_links_sit_beside_the_api_root() {
        let client = ApiClient::new("http://localhost:5003/api/", None);
        assert_eq!(client.base_url(), "http://localhost:5003/api");
        assert_eq!(
            client.upload_url("1-abc.pdf"),
            "http://localhost:5003/uploads/1-abc.pdf"
        );
    }

    #[test]
    fn sign_in_routes_never_send_the_stored_token() {
        let client = ApiClient::new("http://localhost:5003/api", Some("stale".into()));
        let login = client
            .anonymous(Method::POST, "/auth/login")
            .build()
            .unwrap();
        assert!(login.headers().get("authorization").is_none());

        let me = client.request(Method::GET, "/auth/me").build().unwrap();
        assert_eq!(me.headers()["authorization"], "Bearer stale");
    }

    #[test]
    fn client_follows_the_session_context() {
        let ctx = SessionContext::load(Box::new(MemoryStorage::default())).unwrap();
        let session = ctx.subscribe();
        assert!(!ApiClient::for_session(DEFAULT_API_URL, &session).is_authenticated());

        ctx.sign_in(Session {
            token: "fresh".into(),
            role: Role::Employee,
            name: "Emp One".into(),
            email: "emp1@x.com".into(),
        })
        .unwrap();
        let client = ApiClient::for_session(DEFAULT_API_URL, &session);
        let req = client.request(Method::GET, "/auth/me").build().unwrap();
        assert_eq!(req.headers()["authorization"], "Bearer fresh");

        ctx.sign_out().unwrap();
        assert!(!ApiClient::for_session(DEFAULT_API_URL, &session).is_authenticated());
    }

    #[test]
    fn project_changes_send_null_to_clear() {
        let changes = ProjectChanges {
            assigned_to: Some(None),
            title: Some("T2".into()),
            ..Default::default()
        };
        let body = serde_json::to_value(&changes).unwrap();
        assert_eq!(body, json!({ "title": "T2", "assignedTo": null }));
    }

    #[test]
    fn login_response_becomes_a_session() {
        let raw = json!({
            "token": "abc",
            "message": "Login successful",
            "role": "teamleader",
            "name": "Lead One",
            "email": "lead1@x.com",
        });
        let session: Session = serde_json::from_value::<LoginResponse>(raw).unwrap().into();
        assert_eq!(session.role, Role::TeamLeader);
        assert_eq!(session.token, "abc");
    }
}

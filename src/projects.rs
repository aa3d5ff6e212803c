// src/projects.rs

use actix_web::{web, HttpResponse};
use log::{debug, info};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::employees::path_id;
use crate::error::ApiError;
use crate::middleware::{AuthUser, EmployeeOnly, TeamLeaderOnly};
use crate::models::{
    deserialize_some, parse_deadline, parse_object_id, Project, ProjectPatch, ProjectStatus,
    ProjectView, Role,
};
use crate::store::user_index;

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub status: Option<String>,
    pub deadline: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    #[serde(deserialize_with = "deserialize_some")]
    pub deadline: Option<Option<String>>,
    #[serde(deserialize_with = "deserialize_some")]
    pub assigned_to: Option<Option<String>>,
}

fn parse_status(raw: &str) -> Result<ProjectStatus, ApiError> {
    raw.parse::<ProjectStatus>()
        .map_err(|e| ApiError::validation(e.to_string()))
}

fn parse_optional_deadline(raw: Option<&str>) -> Result<Option<chrono::DateTime<chrono::Utc>>, ApiError> {
    match raw.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => parse_deadline(d)
            .map(Some)
            .ok_or_else(|| ApiError::validation("Invalid deadline")),
        None => Ok(None),
    }
}

/// Empty or missing means unassigned; otherwise the id must name a user.
async fn resolve_assignee(
    state: &AppState,
    raw: Option<&str>,
) -> Result<Option<ObjectId>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|a| !a.is_empty()) else {
        return Ok(None);
    };
    let id = parse_object_id(raw).ok_or_else(|| ApiError::validation("Invalid assignee id"))?;
    if state.users.find_user(&id).await?.is_none() {
        return Err(ApiError::not_found("Assignee not found"));
    }
    Ok(Some(id))
}

/// Resolves every user referenced by `projects` in one lookup.
pub(crate) async fn project_views(
    state: &AppState,
    projects: &[Project],
) -> Result<Vec<ProjectView>, ApiError> {
    let mut ids: Vec<ObjectId> = projects.iter().flat_map(Project::referenced_users).collect();
    ids.sort();
    ids.dedup();
    let users = user_index(state.users.as_ref(), &ids).await?;
    Ok(projects.iter().map(|p| ProjectView::build(p, &users)).collect())
}

pub(crate) async fn project_view(state: &AppState, project: &Project) -> Result<ProjectView, ApiError> {
    let users = user_index(state.users.as_ref(), &project.referenced_users()).await?;
    Ok(ProjectView::build(project, &users))
}

pub(crate) async fn load_project(state: &AppState, id: &ObjectId) -> Result<Project, ApiError> {
    state
        .projects
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))
}

/// GET /api/projects
/// Team leaders see every project, employees only their own.
pub async fn list_projects(
    auth: AuthUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let projects = match auth.role {
        Role::TeamLeader => data.projects.list_projects(None).await?,
        Role::Employee => data.projects.list_projects(Some(&auth.id)).await?,
    };
    Ok(HttpResponse::Ok().json(project_views(&data, &projects).await?))
}

/// GET /api/projects/my-projects
pub async fn my_projects(
    EmployeeOnly(auth): EmployeeOnly,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let projects = data.projects.list_projects(Some(&auth.id)).await?;
    let views = project_views(&data, &projects).await?;
    Ok(HttpResponse::Ok().json(json!({ "projects": views })))
}

/// GET /api/projects/{id}
pub async fn get_project(
    _auth: AuthUser,
    data: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let project = load_project(&data, &path_id(&id)?).await?;
    Ok(HttpResponse::Ok().json(project_view(&data, &project).await?))
}

/// POST /api/projects
pub async fn create_project(
    TeamLeaderOnly(leader): TeamLeaderOnly,
    data: web::Data<AppState>,
    body: web::Json<CreateProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("create_project called by {} with payload: {:?}", leader.id, body);
    let title = body.title.trim();
    if title.is_empty() {
        return Err(ApiError::validation("title is required"));
    }
    let status = match body.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_status(raw)?,
        None => ProjectStatus::default(),
    };
    let deadline = parse_optional_deadline(body.deadline.as_deref())?;
    let assigned_to = resolve_assignee(&data, body.assigned_to.as_deref()).await?;

    let project = Project::new(
        title.to_string(),
        body.description.clone(),
        assigned_to,
        status,
        deadline,
    );
    data.projects.insert_project(&project).await?;
    info!("Project created {}", project.id);
    Ok(HttpResponse::Created().json(project_view(&data, &project).await?))
}

/// PUT /api/projects/{id}
pub async fn update_project(
    TeamLeaderOnly(leader): TeamLeaderOnly,
    data: web::Data<AppState>,
    id: web::Path<String>,
    body: web::Json<UpdateProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path_id(&id)?;
    let body = body.into_inner();

    let title = match body.title {
        Some(t) if t.trim().is_empty() => return Err(ApiError::validation("title is required")),
        Some(t) => Some(t.trim().to_string()),
        None => None,
    };
    let assigned_to = match body.assigned_to {
        Some(raw) => Some(resolve_assignee(&data, raw.as_deref()).await?),
        None => None,
    };
    let patch = ProjectPatch {
        title,
        description: body.description,
        status: body.status.as_deref().map(parse_status).transpose()?,
        deadline: body
            .deadline
            .map(|d| parse_optional_deadline(d.as_deref()))
            .transpose()?,
        assigned_to,
    };
    if patch.is_empty() {
        return Err(ApiError::validation("No fields to update"));
    }

    let project = data
        .projects
        .update_project(&id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    info!("Project {} updated by {}", id, leader.id);
    Ok(HttpResponse::Ok().json(project_view(&data, &project).await?))
}

/// PATCH /api/projects/{id}/toggle-status
pub async fn toggle_status(
    TeamLeaderOnly(leader): TeamLeaderOnly,
    data: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_id(&id)?;
    let current = load_project(&data, &id).await?;
    let next = current.status.toggled();
    let project = data
        .projects
        .set_project_status(&id, next)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    info!(
        "Project {} toggled {} -> {} by {}",
        id, current.status, next, leader.id
    );
    Ok(HttpResponse::Ok().json(project_view(&data, &project).await?))
}

/// DELETE /api/projects/{id}
pub async fn delete_project(
    TeamLeaderOnly(leader): TeamLeaderOnly,
    data: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_id(&id)?;
    if !data.projects.delete_project(&id).await? {
        return Err(ApiError::not_found("Project not found"));
    }
    info!("Project {} deleted by {}", id, leader.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Project deleted successfully" })))
}

// src/project_feed.rs
//
// Employee updates and team leader reviews embedded in a project.

use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::employees::path_id;
use crate::error::ApiError;
use crate::middleware::{AuthUser, EmployeeOnly, TeamLeaderOnly};
use crate::models::{Project, ProjectUpdate, Review, ReviewView, UpdateStatus, UpdateView};
use crate::projects::load_project;
use crate::store::user_index;
use crate::uploads;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ReviewRequest {
    pub message: String,
}

async fn update_views(state: &AppState, project: &Project) -> Result<Vec<UpdateView>, ApiError> {
    let users = user_index(state.users.as_ref(), &project.referenced_users()).await?;
    Ok(project
        .updates_newest_first()
        .into_iter()
        .map(|u| UpdateView::build(u, &users))
        .collect())
}

async fn review_views(state: &AppState, project: &Project) -> Result<Vec<ReviewView>, ApiError> {
    let users = user_index(state.users.as_ref(), &project.referenced_users()).await?;
    Ok(project
        .reviews_newest_first()
        .into_iter()
        .map(|r| ReviewView::build(r, &users))
        .collect())
}

/// POST /api/projects/{id}/share
///
/// The body is read before any lookup, but nothing touches the disk until the
/// caller is known to be the assignee.
pub async fn share_update(
    EmployeeOnly(auth): EmployeeOnly,
    data: web::Data<AppState>,
    id: web::Path<String>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let project_id = path_id(&id)?;
    let submission =
        uploads::read_submission(&req, payload, data.config.max_upload_bytes).await?;
    debug!(
        "share_update on {} by {}: message {} chars, file {}",
        project_id,
        auth.id,
        submission.message.len(),
        submission.file.is_some()
    );
    if submission.is_empty() {
        return Err(ApiError::validation("Message or file is required"));
    }

    let project = load_project(&data, &project_id).await?;
    if project.assigned_to != Some(auth.id) {
        warn!(
            "Employee {} tried to share on project {} not assigned to them",
            auth.id, project_id
        );
        return Err(ApiError::forbidden("You are not assigned to this project"));
    }

    let file = match &submission.file {
        Some(file) => Some(uploads::save(&data.config.upload_dir, file).await?),
        None => None,
    };
    let update = ProjectUpdate::new(auth.id, auth.role, submission.message.trim().to_string(), file);
    let project = data
        .projects
        .push_update(&project_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    info!("Update {} shared on project {}", update.id, project_id);

    Ok(HttpResponse::Created().json(json!({
        "message": "Update shared successfully",
        "updates": update_views(&data, &project).await?,
    })))
}

/// GET /api/projects/{id}/updates
pub async fn list_updates(
    _auth: AuthUser,
    data: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let project = load_project(&data, &path_id(&id)?).await?;
    Ok(HttpResponse::Ok().json(json!({ "updates": update_views(&data, &project).await? })))
}

/// PUT /api/projects/{project_id}/updates/{update_id}
pub async fn set_update_status(
    TeamLeaderOnly(leader): TeamLeaderOnly,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, update_id) = path.into_inner();
    let project_id = path_id(&project_id)?;
    let update_id = path_id(&update_id)?;
    let status = body
        .status
        .parse::<UpdateStatus>()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let project = load_project(&data, &project_id).await?;
    if project.find_update(&update_id).is_none() {
        return Err(ApiError::not_found("Update not found"));
    }
    if !data
        .projects
        .set_update_status(&project_id, &update_id, status)
        .await?
    {
        return Err(ApiError::not_found("Update not found"));
    }
    info!(
        "Update {} on project {} set to {} by {}",
        update_id, project_id, status, leader.id
    );

    let project = load_project(&data, &project_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "updates": update_views(&data, &project).await? })))
}

/// POST /api/projects/{id}/review
pub async fn add_review(
    TeamLeaderOnly(leader): TeamLeaderOnly,
    data: web::Data<AppState>,
    id: web::Path<String>,
    body: web::Json<ReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    let project_id = path_id(&id)?;
    let message = body.message.trim();
    if message.is_empty() {
        return Err(ApiError::validation("Review message is required"));
    }
    let review = Review::new(leader.id, message.to_string());
    let project = data
        .projects
        .push_review(&project_id, &review)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    info!("Review {} added to project {}", review.id, project_id);
    Ok(HttpResponse::Created().json(json!({ "reviews": review_views(&data, &project).await? })))
}

/// GET /api/projects/{id}/reviews
pub async fn list_reviews(
    _auth: AuthUser,
    data: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let project = load_project(&data, &path_id(&id)?).await?;
    Ok(HttpResponse::Ok().json(json!({ "reviews": review_views(&data, &project).await? })))
}

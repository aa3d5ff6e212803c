// src/employees.rs

use actix_web::{web, HttpResponse};
use log::{debug, info};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::{create_account, NewAccount};
use crate::error::ApiError;
use crate::middleware::{EmployeeOnly, TeamLeaderOnly};
use crate::models::{parse_object_id, Role, UserPatch, UserStatus, UserView};
use crate::validate;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CreateEmployeeRequest {
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeRequest {
    pub fullname: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    /// Present only so that attempts to change it can be refused.
    pub password: Option<String>,
}

impl UpdateEmployeeRequest {
    fn into_patch(self) -> Result<UserPatch, ApiError> {
        Ok(UserPatch {
            fullname: self
                .fullname
                .map(|f| validate::require_non_empty(&f, "fullname"))
                .transpose()?,
            username: self.username.map(|u| validate::username(&u)).transpose()?,
            email: self.email.map(|e| validate::email(&e)).transpose()?,
            role: self
                .role
                .map(|r| r.parse::<Role>())
                .transpose()
                .map_err(|e| ApiError::validation(e.to_string()))?,
            status: self
                .status
                .map(|s| s.parse::<UserStatus>())
                .transpose()
                .map_err(|e| ApiError::validation(e.to_string()))?,
        })
    }
}

pub(crate) fn path_id(raw: &str) -> Result<ObjectId, ApiError> {
    parse_object_id(raw).ok_or_else(|| ApiError::validation("Invalid id"))
}

/// GET /api/employees
pub async fn list_employees(
    _leader: TeamLeaderOnly,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let employees: Vec<UserView> = data
        .users
        .list_users(Role::Employee)
        .await?
        .iter()
        .map(UserView::from)
        .collect();
    Ok(HttpResponse::Ok().json(employees))
}

/// GET /api/employees/me
pub async fn my_profile(
    EmployeeOnly(auth): EmployeeOnly,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let me = data
        .users
        .find_user(&auth.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;
    Ok(HttpResponse::Ok().json(UserView::from(&me)))
}

/// GET /api/employees/{id}
pub async fn get_employee(
    _leader: TeamLeaderOnly,
    data: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_id(&id)?;
    let employee = data
        .users
        .find_user(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;
    Ok(HttpResponse::Ok().json(UserView::from(&employee)))
}

/// POST /api/employees
pub async fn create_employee(
    TeamLeaderOnly(leader): TeamLeaderOnly,
    data: web::Data<AppState>,
    body: web::Json<CreateEmployeeRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("create_employee called by {} for {}", leader.id, body.username);
    let account = NewAccount::validate(
        &body.fullname,
        &body.email,
        &body.username,
        &body.password,
        body.role.as_deref(),
        body.status.as_deref(),
    )?;
    let user = create_account(&data, account).await?;
    info!("Employee {} created by {}", user.id, leader.id);
    Ok(HttpResponse::Created().json(json!({
        "message": "Employee created successfully",
        "user": UserView::from(&user),
    })))
}

/// PUT /api/employees/{id}
pub async fn update_employee(
    TeamLeaderOnly(leader): TeamLeaderOnly,
    data: web::Data<AppState>,
    id: web::Path<String>,
    body: web::Json<UpdateEmployeeRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path_id(&id)?;
    let body = body.into_inner();
    if body.password.is_some() {
        return Err(ApiError::forbidden("Password cannot be changed here"));
    }
    let patch = body.into_patch()?;
    if patch.is_empty() {
        return Err(ApiError::validation("No fields to update"));
    }

    let updated = data
        .users
        .update_user(&id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;
    info!("Employee {} updated by {}", id, leader.id);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully",
        "updated": UserView::from(&updated),
    })))
}

/// DELETE /api/employees/{id}
pub async fn delete_employee(
    TeamLeaderOnly(leader): TeamLeaderOnly,
    data: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path_id(&id)?;
    if !data.users.delete_user(&id).await? {
        return Err(ApiError::not_found("Employee not found"));
    }
    info!("Employee {} deleted by {}", id, leader.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Employee deleted successfully" })))
}

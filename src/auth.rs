use actix_web::{web, HttpResponse};
use bcrypt::{hash, verify};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{Role, User, UserStatus, UserView};
use crate::validate;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A validated account ready to be hashed and stored.
#[derive(Debug)]
pub struct NewAccount {
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: Role,
    pub status: UserStatus,
}

impl NewAccount {
    pub fn validate(
        fullname: &str,
        email: &str,
        username: &str,
        password: &str,
        role: Option<&str>,
        status: Option<&str>,
    ) -> Result<Self, ApiError> {
        let fullname = validate::require_non_empty(fullname, "fullname")?;
        let email = validate::email(email)?;
        let username = validate::username(username)?;
        validate::password(password)?;
        let role = match role.map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => raw
                .parse::<Role>()
                .map_err(|e| ApiError::validation(e.to_string()))?,
            None => Role::Employee,
        };
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<UserStatus>()
                .map_err(|e| ApiError::validation(e.to_string()))?,
            None => UserStatus::Active,
        };
        Ok(Self {
            fullname,
            email,
            username,
            password: password.to_string(),
            role,
            status,
        })
    }
}

/// bcrypt is CPU bound, so it runs on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    let hashed = web::block(move || hash(password, cost)).await??;
    Ok(hashed)
}

pub async fn verify_password(password: String, hashed: String) -> Result<bool, ApiError> {
    let matches = web::block(move || verify(password, &hashed)).await?;
    // A corrupt stored hash counts as a mismatch.
    Ok(matches.unwrap_or(false))
}

/// Stores a new user after checking that neither the email nor the username
/// is taken. The unique indexes catch the race between check and insert.
pub async fn create_account(state: &AppState, account: NewAccount) -> Result<User, ApiError> {
    if let Some(existing) = state
        .users
        .find_user_by_email_or_username(&account.email, &account.username)
        .await?
    {
        let field = if existing.email == account.email {
            "Email"
        } else {
            "Username"
        };
        return Err(ApiError::Conflict(format!("{} already in use", field)));
    }

    let hashed = hash_password(account.password, state.config.bcrypt_cost).await?;
    let user = User::new(
        account.fullname,
        account.username,
        account.email,
        hashed,
        account.role,
        account.status,
    );
    state.users.insert_user(&user).await?;
    Ok(user)
}

/// POST /api/auth/register
pub async fn register(
    data: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("register called for email {}", body.email);
    let account = NewAccount::validate(
        &body.fullname,
        &body.email,
        &body.username,
        &body.password,
        body.role.as_deref(),
        None,
    )?;
    let user = create_account(&data, account).await?;
    info!("Registered user {} as {}", user.id, user.role);
    Ok(HttpResponse::Created().json(json!({
        "message": "Registered successfully",
        "user": UserView::from(&user),
    })))
}

static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

/// Checked against on the unknown-email branch so it costs the same bcrypt
/// work as a wrong password.
async fn dummy_hash(cost: u32) -> Result<&'static str, ApiError> {
    DUMMY_HASH
        .get_or_try_init(|| hash_password("no-such-account".to_string(), cost))
        .await
        .map(String::as_str)
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid credentials")
}

/// POST /api/auth/login
///
/// Unknown email, wrong password and inactive account all produce the same
/// response.
pub async fn login(
    data: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }
    let email = validate::normalize_identity(&body.email);

    let Some(user) = data.users.find_user_by_email(&email).await? else {
        warn!("Login attempt for unknown email");
        let hashed = dummy_hash(data.config.bcrypt_cost).await?;
        verify_password(body.password.clone(), hashed.to_string()).await?;
        return Err(invalid_credentials());
    };
    if !verify_password(body.password.clone(), user.password.clone()).await? {
        warn!("Login attempt with bad password for user {}", user.id);
        return Err(invalid_credentials());
    }
    if user.status == UserStatus::Inactive {
        warn!("Login attempt for inactive user {}", user.id);
        return Err(invalid_credentials());
    }

    let token = data.tokens.issue(&user.id, user.role)?;
    info!("User {} logged in", user.id);
    Ok(HttpResponse::Ok().json(json!({
        "token": token,
        "message": "Login successful",
        "role": user.role,
        "name": user.fullname,
        "email": user.email,
    })))
}

/// GET /api/auth/me
pub async fn me(auth: AuthUser, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let user = data
        .users
        .find_user(&auth.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(HttpResponse::Ok().json(json!({ "user": UserView::from(&user) })))
}

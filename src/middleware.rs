// src/middleware.rs

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::{ok, ready, Ready};
use log::{debug, warn};
use mongodb::bson::oid::ObjectId;

use crate::error::ApiError;
use crate::models::Role;
use crate::token::TokenService;

/// Identity attached to the request once its bearer token has been verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: ObjectId,
    pub role: Role,
}

/// Set in place of an [`AuthUser`] when the request carried a bad token.
#[derive(Debug, Clone, Copy)]
struct RejectedToken;

/// Verifies `Authorization: Bearer <token>` on every request.
///
/// A valid token attaches an [`AuthUser`] to the request extensions and a bad
/// one leaves a [`RejectedToken`] marker. The request always reaches the
/// route: public routes ignore the header, protected handlers answer 401
/// through the [`AuthUser`] extractor.
#[derive(Clone)]
pub struct Authentication {
    tokens: TokenService,
}

impl Authentication {
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service,
            tokens: self.tokens.clone(),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    tokens: TokenService,
}

/// Pulls the token out of an authorization header value.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
            let verified = auth_header
                .to_str()
                .ok()
                .and_then(bearer_token)
                .ok_or_else(|| "malformed authorization header".to_string())
                .and_then(|token| self.tokens.verify(token).map_err(|e| e.to_string()));

            match verified {
                Ok(identity) => {
                    req.extensions_mut().insert(AuthUser {
                        id: identity.id,
                        role: identity.role,
                    });
                }
                Err(reason) => {
                    debug!("Bad token on {}: {}", req.path(), reason);
                    req.extensions_mut().insert(RejectedToken);
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

fn authenticated(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let extensions = req.extensions();
    if let Some(user) = extensions.get::<AuthUser>() {
        return Ok(*user);
    }
    if extensions.get::<RejectedToken>().is_some() {
        warn!("Rejected token on {}", req.path());
        return Err(ApiError::unauthorized("Invalid token"));
    }
    Err(ApiError::unauthorized("No token provided"))
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticated(req))
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Employee => "Employee",
        Role::TeamLeader => "Team Leader",
    }
}

/// Role check: the authenticated role must be one of `allowed`.
pub fn authorize(user: &AuthUser, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&user.role) {
        return Ok(());
    }
    let names: Vec<&str> = allowed.iter().copied().map(role_label).collect();
    Err(ApiError::forbidden(format!(
        "Access denied: {} only",
        names.join(" or ")
    )))
}

fn extract_with_role(req: &HttpRequest, role: Role) -> Result<AuthUser, ApiError> {
    // Authentication is checked before the role so a missing token is 401.
    let user = authenticated(req)?;
    authorize(&user, &[role])?;
    Ok(user)
}

/// Extractor admitting only team leaders.
#[derive(Debug, Clone, Copy)]
pub struct TeamLeaderOnly(pub AuthUser);

impl FromRequest for TeamLeaderOnly {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(extract_with_role(req, Role::TeamLeader).map(TeamLeaderOnly))
    }
}

/// Extractor admitting only employees.
#[derive(Debug, Clone, Copy)]
pub struct EmployeeOnly(pub AuthUser);

impl FromRequest for EmployeeOnly {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(extract_with_role(req, Role::Employee).map(EmployeeOnly))
    }
}

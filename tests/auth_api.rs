#[macro_use]
mod common;

use std::time::Duration;

use actix_web::test::TestRequest;
use serde_json::json;

use common::{TestEnv, PASSWORD};
use project_tracker::models::{Role, UserStatus, UserPatch};
use project_tracker::token::TokenService;

#[actix_web::test]
async fn register_login_and_me() {
    let env = TestEnv::new();
    let app = init_app!(env.state.clone());

    let (status, body) = call_json!(
        &app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "fullname": "Lead One",
            "email": "Lead1@X.com",
            "username": "lead1",
            "password": PASSWORD,
            "role": "teamleader",
        }))
    );
    assert_eq!(status, 201);
    assert_eq!(body["message"], "Registered successfully");
    assert_eq!(body["user"]["email"], "lead1@x.com");
    assert_eq!(body["user"]["role"], "teamleader");
    assert!(body["user"].get("password").is_none());

    let (status, body) = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "lead1@x.com", "password": PASSWORD }))
    );
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["role"], "teamleader");
    assert_eq!(body["name"], "Lead One");
    let token = body["token"].as_str().unwrap().to_string();

    let identity = env.state.tokens.verify(&token).unwrap();
    assert_eq!(identity.role, Role::TeamLeader);

    let (status, body) = call_json!(
        &app,
        TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
    );
    assert_eq!(status, 200);
    assert_eq!(body["user"]["username"], "lead1");
    assert_eq!(body["user"]["id"], identity.id.to_hex());
}

#[actix_web::test]
async fn duplicate_email_or_username_is_rejected() {
    let env = TestEnv::new();
    env.seed_user("emp1", Role::Employee).await;
    let app = init_app!(env.state.clone());

    let (status, body) = call_json!(
        &app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "fullname": "Other",
            "email": "emp1@x.com",
            "username": "someone-else",
            "password": PASSWORD,
        }))
    );
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Email already in use");

    let (status, body) = call_json!(
        &app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "fullname": "Other",
            "email": "fresh@x.com",
            "username": "EMP1",
            "password": PASSWORD,
        }))
    );
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Username already in use");

    assert_eq!(env.state.users.list_users(Role::Employee).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn bad_credentials_are_indistinguishable() {
    let env = TestEnv::new();
    let emp = env.seed_user("emp1", Role::Employee).await;
    let app = init_app!(env.state.clone());

    let wrong_password = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "emp1@x.com", "password": "not-the-password" }))
    );
    let unknown_email = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "nobody@x.com", "password": PASSWORD }))
    );
    assert_eq!(wrong_password.0, 401);
    assert_eq!(wrong_password, unknown_email);

    let patch = UserPatch {
        status: Some(UserStatus::Inactive),
        ..Default::default()
    };
    env.state.users.update_user(&emp.id, &patch).await.unwrap();
    let inactive = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "emp1@x.com", "password": PASSWORD }))
    );
    assert_eq!(inactive, unknown_email);
}

#[actix_web::test]
async fn invalid_registration_payloads() {
    let env = TestEnv::new();
    let app = init_app!(env.state.clone());

    let (status, body) = call_json!(
        &app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "fullname": "Short",
            "email": "short@x.com",
            "username": "short",
            "password": "123",
        }))
    );
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Password must be at least 8 characters");

    let (status, body) = call_json!(
        &app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "fullname": "Boss",
            "email": "boss@x.com",
            "username": "boss",
            "password": PASSWORD,
            "role": "admin",
        }))
    );
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Invalid role: admin");

    let (status, body) = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/auth/register")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
    );
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().starts_with("Invalid request body"));
}

#[actix_web::test]
async fn token_problems_are_unauthorized() {
    let env = TestEnv::new();
    let app = init_app!(env.state.clone());

    let (status, body) = call_json!(&app, TestRequest::get().uri("/api/auth/me"));
    assert_eq!(status, 401);
    assert_eq!(body["message"], "No token provided");

    let (status, body) = call_json!(
        &app,
        TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(("Authorization", "Bearer garbage"))
    );
    assert_eq!(status, 401);
    assert_eq!(body["message"], "Invalid token");
}

#[actix_web::test]
async fn stale_bearer_does_not_block_login_or_register() {
    let env = TestEnv::new();
    let lead = env.seed_user("lead1", Role::TeamLeader).await;
    let app = init_app!(env.state.clone());

    // Signed by a previous deployment's secret, so it no longer verifies.
    let stale = TokenService::new("rotated-secret", Duration::from_secs(60))
        .issue(&lead.id, lead.role)
        .unwrap();
    let header = ("Authorization", format!("Bearer {}", stale));

    let (status, body) = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/auth/login")
            .insert_header(header.clone())
            .set_json(json!({ "email": lead.email, "password": PASSWORD }))
    );
    assert_eq!(status, 200);
    assert!(body["token"].as_str().is_some());

    let (status, _) = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/auth/register")
            .insert_header(header.clone())
            .set_json(json!({
                "fullname": "Emp Two",
                "email": "emp2@x.com",
                "username": "emp2",
                "password": PASSWORD,
            }))
    );
    assert_eq!(status, 201);

    // Protected routes still refuse it.
    let (status, body) = call_json!(
        &app,
        TestRequest::get().uri("/api/auth/me").insert_header(header)
    );
    assert_eq!(status, 401);
    assert_eq!(body["message"], "Invalid token");
}

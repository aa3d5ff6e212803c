#[macro_use]
mod common;

use actix_web::test::TestRequest;
use serde_json::json;

use common::{TestEnv, PASSWORD};
use project_tracker::models::Role;

#[actix_web::test]
async fn leader_manages_employees() {
    let env = TestEnv::new();
    let lead = env.seed_user("lead1", Role::TeamLeader).await;
    env.seed_user("emp1", Role::Employee).await;
    let app = init_app!(env.state.clone());

    let (status, body) = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/employees")
            .insert_header(env.bearer(&lead))
            .set_json(json!({
                "fullname": "Emp Two",
                "username": "emp2",
                "email": "emp2@x.com",
                "password": PASSWORD,
            }))
    );
    assert_eq!(status, 201);
    assert_eq!(body["message"], "Employee created successfully");
    assert_eq!(body["user"]["role"], "employee");
    assert_eq!(body["user"]["status"], "Active");
    let emp2 = body["user"]["id"].as_str().unwrap().to_string();

    let (status, list) = call_json!(
        &app,
        TestRequest::get()
            .uri("/api/employees")
            .insert_header(env.bearer(&lead))
    );
    assert_eq!(status, 200);
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["emp2", "emp1"]);
    assert!(list[0].get("password").is_none());

    let (status, body) = call_json!(
        &app,
        TestRequest::put()
            .uri(&format!("/api/employees/{}", emp2))
            .insert_header(env.bearer(&lead))
            .set_json(json!({ "fullname": "Emp 2", "status": "inactive" }))
    );
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Employee updated successfully");
    assert_eq!(body["updated"]["fullname"], "Emp 2");
    assert_eq!(body["updated"]["status"], "Inactive");

    let (status, body) = call_json!(
        &app,
        TestRequest::put()
            .uri(&format!("/api/employees/{}", emp2))
            .insert_header(env.bearer(&lead))
            .set_json(json!({ "password": "new-password" }))
    );
    assert_eq!(status, 403);
    assert_eq!(body["message"], "Password cannot be changed here");

    let (status, body) = call_json!(
        &app,
        TestRequest::put()
            .uri(&format!("/api/employees/{}", emp2))
            .insert_header(env.bearer(&lead))
            .set_json(json!({ "email": "emp1@x.com" }))
    );
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Email already in use");

    let (status, body) = call_json!(
        &app,
        TestRequest::get()
            .uri(&format!("/api/employees/{}", emp2))
            .insert_header(env.bearer(&lead))
    );
    assert_eq!(status, 200);
    assert_eq!(body["email"], "emp2@x.com");

    let (status, _) = call_json!(
        &app,
        TestRequest::delete()
            .uri(&format!("/api/employees/{}", emp2))
            .insert_header(env.bearer(&lead))
    );
    assert_eq!(status, 200);

    let (status, body) = call_json!(
        &app,
        TestRequest::delete()
            .uri(&format!("/api/employees/{}", emp2))
            .insert_header(env.bearer(&lead))
    );
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Employee not found");
}

#[actix_web::test]
async fn employee_sees_only_own_profile() {
    let env = TestEnv::new();
    let emp = env.seed_user("emp1", Role::Employee).await;
    let lead = env.seed_user("lead1", Role::TeamLeader).await;
    let app = init_app!(env.state.clone());

    let (status, body) = call_json!(
        &app,
        TestRequest::get()
            .uri("/api/employees/me")
            .insert_header(env.bearer(&emp))
    );
    assert_eq!(status, 200);
    assert_eq!(body["username"], "emp1");

    let (status, _) = call_json!(
        &app,
        TestRequest::get()
            .uri("/api/employees")
            .insert_header(env.bearer(&emp))
    );
    assert_eq!(status, 403);

    let (status, _) = call_json!(
        &app,
        TestRequest::get()
            .uri("/api/employees/me")
            .insert_header(env.bearer(&lead))
    );
    assert_eq!(status, 403);

    let (status, _) = call_json!(&app, TestRequest::get().uri("/api/employees/me"));
    assert_eq!(status, 401);
}

#[macro_use]
mod common;

use actix_web::test::TestRequest;
use serde_json::json;

use common::TestEnv;
use project_tracker::models::Role;

#[actix_web::test]
async fn broadcasts_reach_everyone() {
    let env = TestEnv::new();
    let lead = env.seed_user("lead1", Role::TeamLeader).await;
    let emp = env.seed_user("emp1", Role::Employee).await;
    let app = init_app!(env.state.clone());

    let (status, body) = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/messages/send")
            .insert_header(env.bearer(&lead))
            .set_json(json!({ "message": "Standup at 10" }))
    );
    assert_eq!(status, 201);
    assert_eq!(body["message"]["senderName"], "lead1 name");
    assert_eq!(body["message"]["senderRole"], "teamleader");
    assert!(body["message"]["recipient"].is_null());

    // An empty recipient id is a broadcast too.
    let (status, _) = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/messages/send")
            .insert_header(env.bearer(&emp))
            .set_json(json!({ "message": "ok", "recipientId": "" }))
    );
    assert_eq!(status, 201);

    for user in [&lead, &emp] {
        let (status, body) = call_json!(
            &app,
            TestRequest::get()
                .uri("/api/messages/broadcast")
                .insert_header(env.bearer(user))
        );
        assert_eq!(status, 200);
        let texts: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["message"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["Standup at 10", "ok"]);
    }
}

#[actix_web::test]
async fn direct_messages_stay_in_their_thread() {
    let env = TestEnv::new();
    let a = env.seed_user("emp_a", Role::Employee).await;
    let b = env.seed_user("emp_b", Role::Employee).await;
    let c = env.seed_user("emp_c", Role::Employee).await;
    let app = init_app!(env.state.clone());

    let (status, _) = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/messages/send")
            .insert_header(env.bearer(&a))
            .set_json(json!({ "message": "hi b", "recipientId": b.id.to_hex() }))
    );
    assert_eq!(status, 201);
    let (status, _) = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/messages/send")
            .insert_header(env.bearer(&b))
            .set_json(json!({ "message": "hi a", "recipientId": a.id.to_hex() }))
    );
    assert_eq!(status, 201);

    let (_, a_b) = call_json!(
        &app,
        TestRequest::get()
            .uri(&format!("/api/messages/employee/{}", b.id.to_hex()))
            .insert_header(env.bearer(&a))
    );
    let texts: Vec<&str> = a_b["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["message"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["hi b", "hi a"]);

    let (_, a_c) = call_json!(
        &app,
        TestRequest::get()
            .uri(&format!("/api/messages/employee/{}", c.id.to_hex()))
            .insert_header(env.bearer(&a))
    );
    assert!(a_c["messages"].as_array().unwrap().is_empty());

    let (_, broadcast) = call_json!(
        &app,
        TestRequest::get()
            .uri("/api/messages/broadcast")
            .insert_header(env.bearer(&c))
    );
    assert!(broadcast["messages"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn send_rejects_bad_input() {
    let env = TestEnv::new();
    let a = env.seed_user("emp_a", Role::Employee).await;
    let app = init_app!(env.state.clone());

    let (status, body) = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/messages/send")
            .insert_header(env.bearer(&a))
            .set_json(json!({ "message": "  " }))
    );
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Message is required");

    let (status, body) = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/messages/send")
            .insert_header(env.bearer(&a))
            .set_json(json!({ "message": "hi", "recipientId": "xyz" }))
    );
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Invalid recipient id");

    let (status, body) = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/messages/send")
            .insert_header(env.bearer(&a))
            .set_json(json!({ "message": "hi", "recipientId": "0123456789abcdef01234567" }))
    );
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Recipient not found");

    let (status, _) = call_json!(
        &app,
        TestRequest::get()
            .uri("/api/messages/employee/xyz")
            .insert_header(env.bearer(&a))
    );
    assert_eq!(status, 400);

    let (status, _) = call_json!(
        &app,
        TestRequest::post()
            .uri("/api/messages/send")
            .set_json(json!({ "message": "hi" }))
    );
    assert_eq!(status, 401);
}

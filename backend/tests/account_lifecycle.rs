//! End-to-end account flows against the in-memory application.

use actix_web::http::StatusCode;
use actix_web::test;
use digidiploma::domain::UserRole;
use digidiploma::test_support::{TEST_PASSWORD, TestHarness};
use rstest::rstest;
use serde_json::{Value, json};

fn reset_token(text: &str) -> String {
    let start = text.find("token=").expect("reset link in mail") + "token=".len();
    text[start..]
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect()
}

#[rstest]
#[actix_web::test]
async fn register_then_log_in_and_read_profile() {
    let harness = TestHarness::new();
    let app = test::init_service(harness.app()).await;

    let req = test::TestRequest::post()
        .uri("/api/users/register")
        .set_json(json!({
            "name": "Ravi Kulkarni",
            "email": "ravi@example.in",
            "password": "diploma-2024",
            "branch": "Electrical Engineering",
            "semester": 5
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "email": "RAVI@example.in", "password": "diploma-2024" }))
        .to_request();
    let session: Value = test::call_and_read_body_json(&app, req).await;
    let token = session["token"].as_str().expect("token");

    let req = test::TestRequest::get()
        .uri("/api/users/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["email"], "ravi@example.in");
    assert_eq!(me["branch"], "Electrical Engineering");
    assert_eq!(me["semester"], 5);

    let req = test::TestRequest::post()
        .uri("/api/users/register")
        .set_json(json!({
            "name": "Someone Else",
            "email": "ravi@example.in",
            "password": "another-pass",
            "branch": "Civil Engineering",
            "semester": 1
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
}

#[rstest]
#[actix_web::test]
async fn password_reset_replaces_the_password_once() {
    let harness = TestHarness::new();
    harness.seed_user(UserRole::Student, "meera@example.in").await;
    let app = test::init_service(harness.app()).await;

    let req = test::TestRequest::post()
        .uri("/api/users/forgot-password")
        .set_json(json!({ "email": "meera@example.in" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let sent = harness.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("http://localhost:5173/reset-password?token="));
    let token = reset_token(&sent[0].text);

    let reset = |password: &str| {
        test::TestRequest::post()
            .uri("/api/users/reset-password")
            .set_json(json!({ "token": token, "password": password }))
            .to_request()
    };
    assert_eq!(
        test::call_service(&app, reset("fresh-pass-9")).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        test::call_service(&app, reset("second-try-9")).await.status(),
        StatusCode::BAD_REQUEST,
        "tokens are single use"
    );

    let login = |password: &str| {
        test::TestRequest::post()
            .uri("/api/users/login")
            .set_json(json!({ "email": "meera@example.in", "password": password }))
            .to_request()
    };
    assert_eq!(
        test::call_service(&app, login(TEST_PASSWORD)).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        test::call_service(&app, login("fresh-pass-9")).await.status(),
        StatusCode::OK
    );
}

#[rstest]
#[actix_web::test]
async fn unknown_address_still_gets_a_generic_answer() {
    let harness = TestHarness::new();
    let app = test::init_service(harness.app()).await;

    let req = test::TestRequest::post()
        .uri("/api/users/forgot-password")
        .set_json(json!({ "email": "ghost@example.in" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert!(harness.mailer.sent().is_empty());
}

#[rstest]
#[actix_web::test]
async fn deactivated_student_loses_access_until_restored() {
    let harness = TestHarness::new();
    let admin = harness.seed_user(UserRole::Admin, "admin@example.in").await;
    let student = harness.seed_user(UserRole::Student, "kiran@example.in").await;
    let app = test::init_service(harness.app()).await;

    let set_status = |active: bool| {
        test::TestRequest::patch()
            .uri(&format!("/api/users/{}/status", student.id))
            .insert_header(harness.bearer(&admin))
            .set_json(json!({ "isActive": active }))
            .to_request()
    };
    let login = || {
        test::TestRequest::post()
            .uri("/api/users/login")
            .set_json(json!({ "email": "kiran@example.in", "password": TEST_PASSWORD }))
            .to_request()
    };

    assert_eq!(test::call_service(&app, set_status(false)).await.status(), StatusCode::OK);
    assert_ne!(test::call_service(&app, login()).await.status(), StatusCode::OK);

    assert_eq!(test::call_service(&app, set_status(true)).await.status(), StatusCode::OK);
    assert_eq!(test::call_service(&app, login()).await.status(), StatusCode::OK);
}

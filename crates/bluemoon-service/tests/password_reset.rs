//! Password reset integration tests.

mod common;

use common::{TestHarness, PASSWORD};
use serde_json::{json, Value};

async fn register_lan(harness: &TestHarness) {
    harness
        .register_resident("5", "0901000001", json!({ "email": "lan@example.com" }))
        .await;
}

async fn request_reset(harness: &TestHarness, email: &str) -> String {
    harness
        .server
        .post("/forgot-password")
        .json(&json!({ "email": email }))
        .await
        .assert_status_ok();
    harness.mailer.last_token().expect("reset mail sent")
}

fn login_body(password: &str) -> Value {
    json!({ "username": "lan@example.com", "password": password, "role": "resident" })
}

#[tokio::test]
async fn reset_replaces_the_password() {
    let harness = TestHarness::new();
    register_lan(&harness).await;

    let token = request_reset(&harness, " LAN@example.com ").await;
    let sent = harness.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "lan@example.com");
    assert!(sent[0].1.starts_with("http://localhost:3000/reset-password?token="));

    harness
        .server
        .post("/reset-password")
        .json(&json!({ "token": token, "new_password": "battery staple" }))
        .await
        .assert_status_ok();

    harness
        .server
        .post("/login")
        .json(&login_body("battery staple"))
        .await
        .assert_status_ok();
    harness
        .server
        .post("/login")
        .json(&login_body(PASSWORD))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn reset_token_is_single_use() {
    let harness = TestHarness::new();
    register_lan(&harness).await;
    let token = request_reset(&harness, "lan@example.com").await;

    harness
        .server
        .post("/reset-password")
        .json(&json!({ "token": token, "new_password": "battery staple" }))
        .await
        .assert_status_ok();
    harness
        .server
        .post("/reset-password")
        .json(&json!({ "token": token, "new_password": "another one" }))
        .await
        .assert_status_bad_request();

    harness
        .server
        .post("/login")
        .json(&login_body("battery staple"))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn expired_token_is_refused() {
    let harness = TestHarness::with_config(|config| config.reset_token_ttl_minutes = 0);
    register_lan(&harness).await;
    let token = request_reset(&harness, "lan@example.com").await;

    harness
        .server
        .post("/reset-password")
        .json(&json!({ "token": token, "new_password": "battery staple" }))
        .await
        .assert_status_bad_request();

    harness
        .server
        .post("/login")
        .json(&login_body(PASSWORD))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn unknown_email_and_token() {
    let harness = TestHarness::new();
    register_lan(&harness).await;

    harness
        .server
        .post("/forgot-password")
        .json(&json!({ "email": "nobody@example.com" }))
        .await
        .assert_status_not_found();
    assert!(harness.mailer.sent().is_empty());

    harness
        .server
        .post("/reset-password")
        .json(&json!({ "token": "deadbeef", "new_password": "battery staple" }))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/forgot-password")
        .json(&json!({ "email": "  " }))
        .await
        .assert_status_bad_request();
    harness
        .server
        .post("/reset-password")
        .json(&json!({ "token": "abc" }))
        .await
        .assert_status_bad_request();
    harness
        .server
        .post("/reset-password")
        .json(&json!({ "new_password": "battery staple" }))
        .await
        .assert_status_bad_request();
}

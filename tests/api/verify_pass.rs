use reqwest::{Method, StatusCode};

use crate::helpers::TestApp;

// A well-formed 32-hex-char serial; the signature checks run before any
// database lookup, so these cases exercise the endpoint without Postgres.
const SERIAL: &str = "5a2f0b1c9d8e7f60514233241506a7b8";

#[tokio::test]
async fn missing_signature_is_unauthorized() {
    let app = TestApp::spawn().await;

    let res = app
        .verify_pass(SERIAL, None)
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
}

#[tokio::test]
async fn forged_signature_is_unauthorized() {
    let app = TestApp::spawn().await;

    let res = app
        .verify_pass(SERIAL, Some("Zm9yZ2VkLXNpZ25hdHVyZQ"))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
}

#[tokio::test]
async fn malformed_serial_is_unauthorized() {
    let app = TestApp::spawn().await;

    let res = app
        .verify_pass("not-a-serial", Some("Zm9yZ2VkLXNpZ25hdHVyZQ"))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
}

#[tokio::test]
async fn card_endpoints_require_credentials() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::GET, "card")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
}

#[tokio::test]
async fn sync_requires_credentials() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::POST, "sync")
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
}

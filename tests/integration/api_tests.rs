//! API tests against a running server

use reqwest::Client;
use serde_json::{json, Value};

use hwlab_server::config::AppConfig;

use crate::common::token;

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Token signed with the secret the running server was configured with
fn auth_token(user_id: i32, is_organizer: bool) -> String {
    let config = AppConfig::load().expect("Failed to load configuration");
    token(&config, user_id, is_organizer)
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_public_hardware_feed() {
    let client = Client::new();

    let response = client
        .get(format!("{}/hardware/api", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["update_time"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/me/requests/pending", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_request_and_cancel() {
    let client = Client::new();
    let organizer = auth_token(1, true);
    let hacker = auth_token(4242, false);
    let name = format!("Test board {}", chrono::Utc::now().timestamp_millis());

    let response = client
        .post(format!("{}/hardware", BASE_URL))
        .bearer_auth(&organizer)
        .json(&json!({
            "name": name,
            "description": "Created by the API tests",
            "total_count": 1
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let hardware: Value = response.json().await.expect("Failed to parse response");
    let hardware_id = hardware["id"].as_i64().expect("No id in response");

    let response = client
        .post(format!("{}/hardware/{}/request", BASE_URL, hardware_id))
        .bearer_auth(&hacker)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let request: Value = response.json().await.expect("Failed to parse response");

    let response = client
        .delete(format!("{}/me/requests/{}", BASE_URL, request["id"]))
        .bearer_auth(&hacker)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .delete(format!("{}/hardware/{}", BASE_URL, hardware_id))
        .bearer_auth(&organizer)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);
}

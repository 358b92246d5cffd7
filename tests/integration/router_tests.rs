//! HTTP tests driving the router in-process

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use hwlab_server::{api, config::AppConfig, models::policy::LendingPolicy};

use crate::common::{token, Lab, HACKER, ORGANIZER};

struct Client {
    app: Router,
    config: AppConfig,
}

impl Client {
    fn new(lab: &Lab) -> Self {
        let config = AppConfig::default();
        Self {
            app: api::router(lab.state(config.clone())),
            config,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<(i32, bool)>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((user_id, is_organizer)) = user {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token(&self.config, user_id, is_organizer)),
            );
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

const HACKER_USER: Option<(i32, bool)> = Some((HACKER, false));
const ORGANIZER_USER: Option<(i32, bool)> = Some((ORGANIZER, true));

#[tokio::test]
async fn test_health() {
    let lab = Lab::new(LendingPolicy::default());
    let client = Client::new(&lab);

    let (status, body) = client.send(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = client.send(Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_requires_token() {
    let lab = Lab::new(LendingPolicy::default());
    let client = Client::new(&lab);

    let (status, _) = client.send(Method::GET, "/api/v1/hardware", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // public feed needs no token
    let (status, body) = client.send(Method::GET, "/api/v1/hardware/api", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_hardware_management_is_for_organizers() {
    let lab = Lab::new(LendingPolicy::default());
    let client = Client::new(&lab);
    let payload = json!({ "name": "Arduino", "description": "Uno", "total_count": 5 });

    let (status, _) = client
        .send(Method::POST, "/api/v1/hardware", HACKER_USER, Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = client
        .send(Method::POST, "/api/v1/hardware", ORGANIZER_USER, Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total_count"], 5);

    let (status, _) = client
        .send(Method::POST, "/api/v1/hardware", ORGANIZER_USER, Some(payload))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = client
        .send(
            Method::POST,
            "/api/v1/hardware",
            ORGANIZER_USER,
            Some(json!({ "name": "", "description": "", "total_count": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_pick_up_and_return_flow() {
    let lab = Lab::new(LendingPolicy::default());
    let hw = lab.hardware("Oculus Rift", 1).await;
    let client = Client::new(&lab);

    let uri = format!("/api/v1/hardware/{}/request", hw.id);
    let (status, request) = client.send(Method::POST, &uri, HACKER_USER, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = request["id"].as_i64().unwrap();

    let (status, body) = client.send(Method::POST, &uri, Some((HACKER + 1, false)), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "No items available");

    let (status, pending) = client
        .send(Method::GET, "/api/v1/me/requests/pending", HACKER_USER, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending[0]["type_name"], "Oculus Rift");
    assert_eq!(pending[0]["state"], "pending");

    let (status, _) = client
        .send(
            Method::POST,
            "/api/v1/requests/pickup",
            HACKER_USER,
            Some(json!({ "request_ids": [request_id] })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, outcome) = client
        .send(
            Method::POST,
            "/api/v1/requests/pickup",
            ORGANIZER_USER,
            Some(json!({ "request_ids": [request_id] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["processed"][0]["borrowed_by"], ORGANIZER);

    let (_, active) = client
        .send(Method::GET, "/api/v1/requests/active", ORGANIZER_USER, None)
        .await;
    assert_eq!(active.as_array().unwrap().len(), 1);

    let (_, summary) = client.send(Method::GET, "/api/v1/me/summary", HACKER_USER, None).await;
    assert_eq!(summary["pending"], 0);
    assert_eq!(summary["active"], 1);

    let (status, outcome) = client
        .send(
            Method::POST,
            "/api/v1/requests/return",
            ORGANIZER_USER,
            Some(json!({ "request_ids": [request_id] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["processed"][0]["returned_to"], ORGANIZER);

    let uri = format!("/api/v1/users/{}/requests/historic", HACKER);
    let (status, historic) = client.send(Method::GET, &uri, ORGANIZER_USER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(historic[0]["state"], "returned");
}

#[tokio::test]
async fn test_cancel_own_request_only() {
    let lab = Lab::new(LendingPolicy::default());
    let hw = lab.hardware("Arduino", 2).await;
    let request = lab.services.inventory.request(hw.id, HACKER).await.unwrap().unwrap();
    let client = Client::new(&lab);

    let uri = format!("/api/v1/me/requests/{}", request.id);
    let (status, _) = client.send(Method::DELETE, &uri, Some((HACKER + 1, false)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = client.send(Method::DELETE, &uri, HACKER_USER, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, pending) = client
        .send(Method::GET, "/api/v1/me/requests/pending", HACKER_USER, None)
        .await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bulk_request_amounts() {
    let lab = Lab::new(LendingPolicy::default());
    let arduino = lab.hardware("Arduino", 1).await;
    let client = Client::new(&lab);

    let (status, outcome) = client
        .send(
            Method::POST,
            "/api/v1/hardware/request",
            HACKER_USER,
            Some(json!({ "amounts": { arduino.id.to_string(): 3 } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["created"].as_array().unwrap().len(), 1);
    assert_eq!(outcome["failures"]["Arduino"], 2);

    let (_, available) = client
        .send(Method::GET, "/api/v1/hardware/available", HACKER_USER, None)
        .await;
    assert!(available.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_requests_closed() {
    let lab = Lab::new(LendingPolicy::new(30, false));
    let hw = lab.hardware("Arduino", 1).await;
    let client = Client::new(&lab);

    let uri = format!("/api/v1/hardware/{}/request", hw.id);
    let (status, body) = client.send(Method::POST, &uri, HACKER_USER, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Hardware lab is not available at the moment!");
}

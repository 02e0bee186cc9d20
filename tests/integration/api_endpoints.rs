//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - All REST endpoints return correct responses
//! - Authentication middleware functions properly
//! - Error handling maps to the right status codes

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use network_monitor::{
    InterfaceStats, LinkStatus,
    api::{ApiConfig, ApiState, router},
    device::DeviceError,
    events::EventGateway,
    storage::MemoryBackend,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::helpers::*;

const TOKEN: &str = "test-token";

fn test_app(device: Arc<FakeDevice>) -> Router {
    let storage = Arc::new(MemoryBackend::new());
    let gateway = EventGateway::default();
    let monitor = spawn_monitor(device, storage.clone(), gateway.clone());
    let state = ApiState::new(vec![monitor], storage, gateway);

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        auth_token: Some(TOKEN.to_string()),
        enable_cors: true,
    };
    router(state, &config)
}

fn overloaded() -> Arc<FakeDevice> {
    let device = FakeDevice::healthy();
    device.set_resources(Ok(resources(95.0)));
    device.set_interfaces(Ok(vec![InterfaceStats::new("ether1", "ether", LinkStatus::Down)]));
    Arc::new(device)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));

    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(Arc::new(FakeDevice::healthy()));

    let (status, body) = send(&app, "GET", "/api/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"]["healthy"], true);
    assert_eq!(body["devices"], 1);
}

#[tokio::test]
async fn test_auth_is_enforced() {
    let app = test_app(Arc::new(FakeDevice::healthy()));

    let missing = Request::builder()
        .uri("/api/v1/devices")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/api/v1/devices")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(wrong).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let basic = Request::builder()
        .uri("/api/v1/devices")
        .header(header::AUTHORIZATION, "Basic YWRtaW46YWRtaW4=")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(basic).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_devices() {
    let app = test_app(Arc::new(FakeDevice::healthy()));

    let (status, body) = send(&app, "GET", "/api/v1/devices", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["devices"][0]["deviceId"], DEVICE_ID);
    assert_eq!(body["devices"][0]["displayName"], "Core Router");
    assert_eq!(body["devices"][0]["isRunning"], false);
}

#[tokio::test]
async fn test_unknown_device_is_404() {
    let app = test_app(Arc::new(FakeDevice::healthy()));

    for (method, uri) in [
        ("GET", "/api/v1/devices/nope/status"),
        ("GET", "/api/v1/devices/nope/data"),
        ("POST", "/api/v1/devices/nope/start"),
        ("GET", "/api/v1/devices/nope/thresholds"),
    ] {
        let (status, body) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert!(body["error"].as_str().unwrap().contains("nope"));
    }
}

#[tokio::test]
async fn test_start_and_stop() {
    let app = test_app(Arc::new(FakeDevice::healthy()));
    let base = format!("/api/v1/devices/{DEVICE_ID}");

    let (status, body) = send(&app, "POST", &format!("{base}/start"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "started", "pollIntervalMs": 60000 }));

    let (_, body) = send(
        &app,
        "POST",
        &format!("{base}/start"),
        Some(json!({ "intervalSeconds": 5 })),
    )
    .await;
    assert_eq!(body, json!({ "status": "already_running" }));

    let (_, body) = send(&app, "GET", &format!("{base}/status"), None).await;
    assert_eq!(body["isRunning"], true);
    assert_eq!(body["pollIntervalMs"], 60000);
    assert!(body["lastSnapshotTimestamp"].is_string());

    let (_, body) = send(&app, "POST", &format!("{base}/stop"), None).await;
    assert_eq!(body, json!({ "status": "stopped" }));

    let (_, body) = send(&app, "POST", &format!("{base}/stop"), None).await;
    assert_eq!(body, json!({ "status": "not_running" }));
}

#[tokio::test]
async fn test_start_with_zero_interval_is_400() {
    let app = test_app(Arc::new(FakeDevice::healthy()));

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/devices/{DEVICE_ID}/start"),
        Some(json!({ "intervalSeconds": 0 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_start_with_invalid_body_is_400() {
    let app = test_app(Arc::new(FakeDevice::healthy()));
    let base = format!("/api/v1/devices/{DEVICE_ID}");

    for body in [
        json!({ "intervalSeconds": "ten" }),
        json!({ "bogus": 1 }),
        json!({ "intervalSeconds": 86_401 }),
        json!({ "intervalSeconds": u64::MAX }),
    ] {
        let (status, response) = send(&app, "POST", &format!("{base}/start"), Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        assert!(response["error"].is_string());
    }

    let request = Request::builder()
        .method("POST")
        .uri(format!("{base}/start"))
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"intervalSeconds\": 5"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, status) = send(&app, "GET", &format!("{base}/status"), None).await;
    assert_eq!(status["isRunning"], false);

    let (status, body) = send(
        &app,
        "POST",
        &format!("{base}/start"),
        Some(json!({ "intervalSeconds": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "started", "pollIntervalMs": 30000 }));
}

#[tokio::test]
async fn test_data_and_poll() {
    let app = test_app(overloaded());
    let base = format!("/api/v1/devices/{DEVICE_ID}");

    let (status, body) = send(&app, "GET", &format!("{base}/data"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "no data yet" }));

    let (status, body) = send(&app, "POST", &format!("{base}/poll"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deviceId"], DEVICE_ID);
    assert_eq!(body["issues"]["critical"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", &format!("{base}/data"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resources"]["status"], "ok");
    assert_eq!(body["resources"]["value"]["cpuLoad"], 95.0);

    let (status, body) = send(&app, "GET", "/api/v1/tickets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, body) = send(&app, "GET", "/api/v1/tickets?limit=1", None).await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_poll_of_unreachable_device_is_502() {
    let device = FakeDevice::healthy();
    device.fail_all(DeviceError::Unreachable("connection refused".to_string()));
    let app = test_app(Arc::new(device));

    let (status, body) = send(&app, "POST", &format!("/api/v1/devices/{DEVICE_ID}/poll"), None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_ping_and_traceroute() {
    let app = test_app(Arc::new(FakeDevice::healthy()));
    let base = format!("/api/v1/devices/{DEVICE_ID}");

    let (status, body) = send(
        &app,
        "POST",
        &format!("{base}/ping"),
        Some(json!({ "host": "8.8.8.8", "count": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sent"], 3);
    assert_eq!(body["received"], 3);
    assert_eq!(body["packetLossPercent"], 0.0);

    let (status, _) = send(
        &app,
        "POST",
        &format!("{base}/ping"),
        Some(json!({ "host": "not a host" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", &format!("{base}/ping"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        &format!("{base}/traceroute"),
        Some(json!({ "host": "1.1.1.1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["host"], "1.1.1.1");
    assert_eq!(body["hops"][0]["address"], "1.1.1.1");
}

#[tokio::test]
async fn test_thresholds_round_trip() {
    let app = test_app(Arc::new(FakeDevice::healthy()));
    let uri = format!("/api/v1/devices/{DEVICE_ID}/thresholds");

    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cpuLoadPercent"], 80.0);

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "cpuLoadPercent": 90.0 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cpuLoadPercent"], 90.0);
    assert_eq!(body["memoryUsagePercent"], 80.0);

    let (_, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(body["cpuLoadPercent"], 90.0);

    for invalid in [
        json!({ "cpuLoadPercent": 150.0 }),
        json!({ "bogus": 1 }),
        json!({}),
    ] {
        let (status, body) = send(&app, "POST", &uri, Some(invalid.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{invalid}");
        assert!(body["error"].is_string());
    }

    // rejected updates leave the set untouched
    let (_, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(body["cpuLoadPercent"], 90.0);
}

#![cfg(all(feature = "server", feature = "sqlite"))]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::Client;
use serde_json::{json, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::net::TcpListener;
use tower::ServiceExt;

use argus::client::VerifyClient;
use argus::errors::LicenseError;
use argus::protocol::Verification;
use argus::server::{build_router, AppState, Database, LicenseRegistry};

/// Build the application router over a fresh in-memory database.
async fn test_app() -> axum::Router {
    test_app_with_pool(Duration::from_secs(5)).await.0
}

/// Like [`test_app`], but also hands back the single-connection pool so a
/// test can starve the registry of storage.
async fn test_app_with_pool(timeout: Duration) -> (axum::Router, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory SQLite");
    let db = Database::SQLite(pool.clone());
    db.init_schema().await.expect("failed to create schema");

    let registry = LicenseRegistry::new(Arc::new(db), timeout);
    (build_router(AppState::new(registry)), pool)
}

/// Serve the app on an ephemeral port and return its base URL.
async fn spawn_server() -> String {
    let app = test_app().await;
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("no local address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });

    format!("http://{addr}")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =============================================================================
// Router-level tests (no network)
// =============================================================================

#[tokio::test]
async fn home_returns_banner() {
    let app = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"Argus License Server - Running");
}

#[tokio::test]
async fn health_reports_license_count() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/add_license",
            &json!({"discord_id": 1, "minecraft_uuid": "abcd-1234", "username": "Alice"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health = body_json(response).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["database"], "connected");
    assert_eq!(health["total_licenses"], 1);
}

#[tokio::test]
async fn verify_with_missing_fields_is_bad_request() {
    let app = test_app().await;

    let response = app
        .oneshot(post_json("/verify", &json!({"uuid": "abcd"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["reason"], "missing identity or fingerprint");
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn verify_with_non_json_body_is_treated_as_missing_fields() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/verify")
                .header("content-type", "text/plain")
                .body(Body::from("uuid=abcd&hwid=HW1"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["reason"], "missing identity or fingerprint");
}

#[tokio::test]
async fn add_license_with_missing_fields_is_bad_request() {
    let app = test_app().await;

    let response = app
        .oneshot(post_json(
            "/add_license",
            &json!({"minecraft_uuid": "abcd", "username": "Alice"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["reason"], "missing required fields");
}

#[tokio::test]
async fn add_license_rejects_non_numeric_account_id() {
    let app = test_app().await;

    let response = app
        .oneshot(post_json(
            "/add_license",
            &json!({"discord_id": "not-a-number", "minecraft_uuid": "abcd", "username": "Alice"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn add_license_accepts_account_id_as_string() {
    let app = test_app().await;

    let response = app
        .oneshot(post_json(
            "/add_license",
            &json!({
                "discord_id": "123456789012345678",
                "minecraft_uuid": "069a79f4-44e9-4726-a5be-fca90e38aaf5",
                "username": "Notch"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["reason"], "license added");
    assert_eq!(body["code"], "REGISTERED");
}

#[tokio::test]
async fn unknown_identity_response_is_redacted() {
    let app = test_app().await;

    let response = app
        .oneshot(post_json(
            "/verify",
            &json!({"uuid": "069A79F4-44E9-4726-A5BE-FCA90E38AAF5", "hwid": "HW1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["reason"], "identity not licensed");
    assert_eq!(body["code"], "NOT_LICENSED");
    assert_eq!(body["uuid"], "069a79f4...");
}

#[tokio::test]
async fn verify_during_storage_outage_is_service_unavailable() {
    let (app, pool) = test_app_with_pool(Duration::from_millis(100)).await;
    let _held = pool.acquire().await.expect("failed to acquire connection");

    let response = app
        .oneshot(post_json("/verify", &json!({"uuid": "abcd", "hwid": "HW1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["code"], "STORAGE_ERROR");
    let reason = body["reason"].as_str().expect("reason is a string");
    assert!(reason.starts_with("server error: "), "got {reason:?}");
    assert!(body.get("uuid").is_none());
}

#[tokio::test]
async fn add_license_during_storage_outage_is_service_unavailable() {
    let (app, pool) = test_app_with_pool(Duration::from_millis(100)).await;
    let _held = pool.acquire().await.expect("failed to acquire connection");

    let response = app
        .oneshot(post_json(
            "/add_license",
            &json!({"discord_id": 1, "minecraft_uuid": "abcd", "username": "Alice"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "STORAGE_ERROR");
}

#[tokio::test]
async fn health_during_storage_outage_is_internal_error() {
    let (app, pool) = test_app_with_pool(Duration::from_millis(100)).await;
    let _held = pool.acquire().await.expect("failed to acquire connection");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let health = body_json(response).await;
    assert_eq!(health["status"], "error");
    assert_eq!(health["database"], "disconnected");
    assert!(health["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert!(health.get("total_licenses").is_none());
}

#[tokio::test]
async fn unknown_identity_with_overlong_fingerprint_is_not_licensed() {
    let app = test_app().await;

    let response = app
        .oneshot(post_json(
            "/verify",
            &json!({"uuid": "ghost", "hwid": "f".repeat(65)}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["code"], "NOT_LICENSED");
    assert_eq!(body["reason"], "identity not licensed");
}

#[cfg(feature = "admin-api")]
#[tokio::test]
async fn reset_hwid_releases_binding() {
    let app = test_app().await;

    app.clone()
        .oneshot(post_json(
            "/add_license",
            &json!({"discord_id": 1, "minecraft_uuid": "abcd", "username": "Alice"}),
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(post_json("/verify", &json!({"uuid": "abcd", "hwid": "OLD"})))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_json("/reset_hwid", &json!({"minecraft_uuid": "abcd"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["code"], "RELEASED");
    assert_eq!(body["reason"], "hardware binding cleared");

    let response = app
        .oneshot(post_json("/verify", &json!({"uuid": "abcd", "hwid": "NEW"})))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["reason"], "hardware bound");
}

// =============================================================================
// End-to-end over HTTP
// =============================================================================

#[tokio::test]
async fn client_end_to_end_scenario() {
    let base_url = spawn_server().await;
    let client = VerifyClient::new(&base_url).expect("client build failed");

    assert_eq!(client.health().await.expect("health failed"), 0);

    client
        .register(1, "ABCD-1234-EFGH-5678", "Alice")
        .await
        .expect("register failed");

    let first = client
        .verify("abcd1234efgh5678", "HW1")
        .await
        .expect("first verify failed");
    assert_eq!(
        first,
        Verification::Bound {
            display_name: "Alice".to_string()
        }
    );

    let second = client
        .verify("ABCD-1234-EFGH-5678", "HW1")
        .await
        .expect("second verify failed");
    assert_eq!(second.reason(), "verified");

    let err = client
        .verify("abcd1234efgh5678", "HW2")
        .await
        .expect_err("mismatch expected");
    assert_eq!(err, LicenseError::HardwareMismatch);
    assert!(err.is_denial());

    let err = client
        .verify("someone-else", "HW1")
        .await
        .expect_err("not licensed expected");
    assert_eq!(err, LicenseError::NotLicensed);

    assert_eq!(client.health().await.expect("health failed"), 1);
}

#[tokio::test]
async fn raw_http_contract() {
    let base_url = spawn_server().await;
    let http = Client::new();

    let response = http
        .post(format!("{base_url}/add_license"))
        .json(&json!({"discord_id": 42, "minecraft_uuid": "abcd", "username": "Bob"}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let response = http
        .post(format!("{base_url}/verify"))
        .json(&json!({"uuid": "abcd", "hwid": "HW1"}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["valid"], true);
    assert_eq!(result["reason"], "hardware bound");
    assert_eq!(result["username"], "Bob");
    assert_eq!(result["code"], "HARDWARE_BOUND");

    let response = http
        .post(format!("{base_url}/verify"))
        .json(&json!({"uuid": "abcd", "hwid": "HW2"}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["valid"], false);
    assert_eq!(
        result["reason"],
        "hardware mismatch: licensed to a different machine"
    );
}

#[tokio::test]
async fn client_reports_unreachable_server_as_retryable() {
    let client = VerifyClient::with_timeout("http://127.0.0.1:9", Duration::from_millis(500))
        .expect("client build failed");

    let err = client
        .verify("abcd", "HW1")
        .await
        .expect_err("nothing is listening");
    assert!(matches!(err, LicenseError::NetworkError(_)), "got {err:?}");
    assert!(err.is_retryable());
}

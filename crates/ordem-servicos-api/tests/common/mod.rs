//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use ordem_servicos_core::clock::Clock;
use ordem_servicos_store::pg_service_order_repository::PgServiceOrderRepository;
use ordem_servicos_test_support::SteppingClock;
use sqlx::PgPool;
use tower::ServiceExt;

use ordem_servicos_api::routes;
use ordem_servicos_api::state::AppState;

/// A clock starting at a fixed instant and advancing one second per reading,
/// so creation order is visible in the stored timestamps.
fn test_clock() -> Arc<dyn Clock> {
    Arc::new(SteppingClock::new(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
        chrono::Duration::seconds(1),
    ))
}

/// Build the full app router with a real `PgServiceOrderRepository`. Uses the
/// same route structure as `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    let repository = Arc::new(PgServiceOrderRepository::new(pool));
    let app_state = AppState::new(test_clock(), repository);

    Router::new()
        .nest("/api/v1", routes::health::router())
        .nest("/api/v1/os", routes::service_orders::router())
        .with_state(app_state)
}

/// Send a request and return the status with the JSON body. Empty and
/// non-JSON bodies (axum's plain-text rejections) come back as `Null`.
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(body)).await
}

/// Send a PUT request with a JSON body and return the response.
pub async fn put_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "PUT", uri, Some(body)).await
}

/// Send a PATCH request with a JSON body and return the response.
pub async fn patch_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "PATCH", uri, Some(body)).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None).await
}

/// Send a DELETE request and return the response.
pub async fn delete(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "DELETE", uri, None).await
}

//! Integration tests for the health endpoint.

mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn test_health_returns_200_with_status_ok() {
    let (app, _state) = common::build_test_app();

    let (status, json) = common::get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["sessions"], 0);
    assert_eq!(json["connections"], 0);
}

#[tokio::test]
async fn test_health_counts_live_sessions() {
    // Arrange
    let (app, state) = common::build_test_app();
    let mut client = common::Client::new();
    client.send(&state, serde_json::json!({"type": "createSession", "name": "Ada"}));

    // Act
    let (status, json) = common::get_json(app, "/health").await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sessions"], 1);
    assert_eq!(json["connections"], 1);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (app, _state) = common::build_test_app();

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/nonexistent")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ws_route_requires_upgrade() {
    let (app, _state) = common::build_test_app();

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/ws")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert!(response.status().is_client_error());
}

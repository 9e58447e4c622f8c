// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Protected routes accept requests with valid tokens
//! 3. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/subjects")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Should return 401 Unauthorized without token
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/subjects")
                .header(header::AUTHORIZATION, "Bearer invalid.token.here")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Should return 401 Unauthorized with invalid token
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_expired_token() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(1, &state.config.jwt_signing_key, -3600);

    let response = common::send(&app, "GET", "/subjects", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_foreign_key_token() {
    let (app, _) = common::create_test_app();
    let token = common::create_test_jwt(1, b"some_other_signing_key_entirely!", 3600);

    let response = common::send(&app, "GET", "/subjects", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_valid_token() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(12345, &state.config.jwt_signing_key, 3600);

    let response = common::send(&app, "GET", "/subjects", Some(&token), None).await;

    // A fresh user simply has no subjects yet
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::json_body(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_token_cookie_is_accepted() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(7, &state.config.jwt_signing_key, 3600);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/subjects")
                .header(header::COOKIE, format!("exam_prep_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unauthorized_error_body() {
    let (app, _) = common::create_test_app();

    let response = common::send(&app, "GET", "/units/1/topics", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = common::json_body(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/subjects")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);

    // Should have CORS headers
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    for origin in [
        "https://evil.example.com",
        "http://localhost.evil.com",
        "http://127.0.0.1.nip.io:5173",
    ] {
        let (app, _) = common::create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/subjects")
                    .header(header::ORIGIN, origin)
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(
            !response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            "{origin} should not be allowed"
        );
    }
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let (app, _) = common::create_test_app();

    let response = common::send(&app, "GET", "/health", None, None).await;

    // Health should be accessible without auth
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(common::json_body(response).await["status"], "ok");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (app, _) = common::create_test_app();

    let response = common::send(&app, "GET", "/nope", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(common::json_body(response).await["error"], "not_found");
}

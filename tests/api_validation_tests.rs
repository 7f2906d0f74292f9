// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API input validation security tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_register_missing_fields() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(json_request(
            "/api/auth/register",
            json!({ "email": "a@example.com", "password": "Secreto1" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");
    assert_eq!(
        body["details"],
        "Todos los campos son requeridos para el registro"
    );
}

#[tokio::test]
async fn test_register_invalid_email() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(json_request(
            "/api/auth/register",
            json!({
                "username": "maria88",
                "email": "not-an-email",
                "password": "Secreto1",
                "name": "María",
                "age": 28,
                "location": "Madrid",
                "genderIdentity": "woman",
                "sexualOrientation": "straight"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_password_too_short() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(json_request(
            "/api/auth/register",
            json!({
                "username": "maria88",
                "email": "maria@example.com",
                "password": "short",
                "name": "María",
                "age": 28,
                "location": "Madrid",
                "genderIdentity": "woman",
                "sexualOrientation": "straight"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_weak_password() {
    let (app, _) = common::create_test_app();

    // Long enough, but no uppercase letter or digit.
    let response = app
        .oneshot(json_request(
            "/api/auth/register",
            json!({
                "username": "maria88",
                "email": "maria@example.com",
                "password": "secretos",
                "name": "María",
                "age": 28,
                "location": "Madrid",
                "genderIdentity": "woman",
                "sexualOrientation": "straight"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["details"]
        .as_str()
        .unwrap()
        .contains("one uppercase letter"));
}

#[tokio::test]
async fn test_register_underage() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(json_request(
            "/api/auth/register",
            json!({
                "username": "kid",
                "email": "kid@example.com",
                "password": "Secreto1",
                "name": "Kid",
                "age": 17,
                "location": "Madrid",
                "genderIdentity": "man",
                "sexualOrientation": "straight"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_valid_body_offline_store() {
    let (app, _) = common::create_test_app();

    // Passes validation, then fails closed on the unavailable store.
    let response = app
        .oneshot(json_request(
            "/api/auth/register",
            json!({
                "username": "maria88",
                "email": "maria@example.com",
                "password": "Secreto1",
                "name": "María",
                "age": 28,
                "location": "Madrid",
                "genderIdentity": "woman",
                "sexualOrientation": "straight"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_login_missing_password() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(json_request(
            "/api/auth/login",
            json!({ "email": "maria@example.com" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["details"], "Please provide email and password");
}

#[tokio::test]
async fn test_login_password_too_short() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(json_request(
            "/api/auth/login",
            json!({ "email": "maria@example.com", "password": "abc" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["details"]
        .as_str()
        .unwrap()
        .contains("Password must be at least 6 characters long"));
}

//! Router tests over the full middleware stack.
//!
//! Each test drives the assembled application through `oneshot` with an
//! in-memory repository, a recording mailer and the in-memory session
//! store, propagating the session cookie by hand between requests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use crate::db::CustomerRepository;
use crate::db::memory::InMemoryCustomerRepository;
use crate::middleware::create_session_layer;
use crate::routes::app;
use crate::services::email::testing::{RecordingMailer, SentEmail};
use crate::state::AppState;

use kram_core::{CustomerId, Email};

fn test_app() -> (Router, Arc<InMemoryCustomerRepository>, Arc<RecordingMailer>) {
    let repo = Arc::new(InMemoryCustomerRepository::new());
    let mailer = Arc::new(RecordingMailer::new());
    let state = AppState::new("http://localhost:3000", repo.clone(), mailer.clone());
    let session_layer = create_session_layer(MemoryStore::default(), false);
    (app(state, session_layer), repo, mailer)
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Extract the session cookie pair from a Set-Cookie header.
fn session_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie set")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_owned()
}

fn register_body(email: &str) -> Value {
    json!({
        "email": email,
        "password": "password1",
        "firstName": "Anna",
        "lastName": "Koval",
    })
}

/// Register through the API and return the session cookie and new id.
async fn register(router: &Router, email: &str) -> (String, CustomerId) {
    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/customer/register",
            None,
            Some(register_body(email)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = session_cookie(&response);
    let body = body_json(response).await;
    let id = CustomerId::new(body["data"]["id"].as_i64().unwrap());
    (cookie, id)
}

#[tokio::test]
async fn test_health_endpoints() {
    let (router, _repo, _mailer) = test_app();

    let response = router
        .clone()
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(request("GET", "/health/ready", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_current_customer_is_null() {
    let (router, _repo, _mailer) = test_app();

    let response = router
        .oneshot(request("GET", "/customer", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "data": null }));
}

#[tokio::test]
async fn test_guarded_routes_reject_without_session() {
    let (router, _repo, _mailer) = test_app();

    for (method, uri) in [
        ("GET", "/customer/details"),
        ("POST", "/customer/logout"),
        ("POST", "/customer/send-confirm-email"),
    ] {
        let response = router
            .clone()
            .oneshot(request(method, uri, None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        let body = body_json(response).await;
        assert_eq!(body["error"], "authentication required");
    }
}

#[tokio::test]
async fn test_register_returns_summary_and_opens_session() {
    let (router, _repo, _mailer) = test_app();

    let (cookie, _id) = register(&router, "a@x.com").await;

    let response = router
        .oneshot(request("GET", "/customer", Some(&cookie), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["email"], "a@x.com");
    assert_eq!(body["data"]["firstName"], "Anna");
    assert_eq!(body["data"]["isEmailConfirmed"], false);
    // The summary never carries secrets
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("note").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let (router, _repo, _mailer) = test_app();
    register(&router, "a@x.com").await;

    let response = router
        .oneshot(request(
            "POST",
            "/customer/register",
            None,
            Some(register_body("a@x.com")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "email already registered");
}

#[tokio::test]
async fn test_register_validation_rejects_bad_input() {
    let (router, repo, _mailer) = test_app();

    let response = router
        .oneshot(request(
            "POST",
            "/customer/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "short" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["details"].as_array().unwrap().len(), 2);

    // Rejected at the boundary: nothing was written
    let stored = repo
        .get_by_email(&Email::parse("not-an-email@x.com").unwrap())
        .await
        .unwrap();
    assert!(stored.is_none());
}

#[tokio::test]
async fn test_login_updates_last_logged_in() {
    let (router, repo, _mailer) = test_app();
    let (_cookie, id) = register(&router, "a@x.com").await;

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/customer/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "password1" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);

    // Stamp is written by a spawned task
    tokio::time::sleep(Duration::from_millis(50)).await;
    let stored = repo.get_by_id(id).await.unwrap().unwrap();
    assert!(stored.last_logged_in.is_some());

    let response = router
        .oneshot(request("GET", "/customer/details", Some(&cookie), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(!body["data"]["lastLoggedIn"].is_null());
}

#[tokio::test]
async fn test_login_wrong_password_leaves_last_logged_in() {
    let (router, repo, _mailer) = test_app();
    let (_cookie, id) = register(&router, "a@x.com").await;

    let response = router
        .oneshot(request(
            "POST",
            "/customer/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "wrong password" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid credentials");

    tokio::time::sleep(Duration::from_millis(50)).await;
    let stored = repo.get_by_id(id).await.unwrap().unwrap();
    assert!(stored.last_logged_in.is_none());
}

#[tokio::test]
async fn test_logout_destroys_session() {
    let (router, _repo, _mailer) = test_app();
    let (cookie, _id) = register(&router, "a@x.com").await;

    let response = router
        .clone()
        .oneshot(request("POST", "/customer/logout", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "data": true }));

    let response = router
        .oneshot(request("GET", "/customer/details", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_second_default_address_takes_over() {
    let (router, _repo, _mailer) = test_app();
    let (cookie, _id) = register(&router, "a@x.com").await;

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/customer/address",
            Some(&cookie),
            Some(json!({ "city": "Kyiv", "firstName": "A", "isDefault": true })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(request(
            "POST",
            "/customer/address",
            Some(&cookie),
            Some(json!({ "city": "Lviv", "firstName": "B", "isDefault": true })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let addresses = body["data"]["addresses"].as_array().unwrap();
    assert_eq!(addresses.len(), 2);
    let defaults: Vec<_> = addresses
        .iter()
        .filter(|a| a["isDefault"] == true)
        .collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0]["city"], "Lviv");
}

#[tokio::test]
async fn test_edit_unknown_address_is_not_found() {
    let (router, _repo, _mailer) = test_app();
    let (cookie, _id) = register(&router, "a@x.com").await;

    let uri = format!("/customer/address/{}", uuid::Uuid::new_v4());
    let response = router
        .oneshot(request(
            "PUT",
            &uri,
            Some(&cookie),
            Some(json!({ "city": "Lviv", "firstName": "B" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_address_missing_required_fields() {
    let (router, _repo, _mailer) = test_app();
    let (cookie, _id) = register(&router, "a@x.com").await;

    let response = router
        .oneshot(request(
            "POST",
            "/customer/address",
            Some(&cookie),
            Some(json!({ "city": "", "firstName": "" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_profile_patch_updates_names_only() {
    let (router, repo, _mailer) = test_app();
    let (cookie, id) = register(&router, "a@x.com").await;

    let response = router
        .oneshot(request(
            "PATCH",
            "/customer",
            Some(&cookie),
            Some(json!({ "firstName": "Oksana" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["firstName"], "Oksana");
    assert_eq!(body["data"]["email"], "a@x.com");

    let stored = repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.first_name, "Oksana");
    assert_eq!(stored.last_name, "Koval");
}

#[tokio::test]
async fn test_empty_profile_patch_is_rejected() {
    let (router, _repo, _mailer) = test_app();
    let (cookie, _id) = register(&router, "a@x.com").await;

    let response = router
        .oneshot(request("PATCH", "/customer", Some(&cookie), Some(json!({}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_change_requires_current_password() {
    let (router, _repo, _mailer) = test_app();
    let (cookie, _id) = register(&router, "a@x.com").await;

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/customer/password",
            Some(&cookie),
            Some(json!({ "currentPassword": "wrong", "newPassword": "brand new pw" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/customer/password",
            Some(&cookie),
            Some(json!({ "currentPassword": "password1", "newPassword": "brand new pw" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // New password works for a fresh login
    let response = router
        .oneshot(request(
            "POST",
            "/customer/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "brand new pw" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reset_is_uniform_for_unknown_email() {
    let (router, _repo, mailer) = test_app();

    let response = router
        .oneshot(request(
            "POST",
            "/customer/reset",
            None,
            Some(json!({ "email": "nobody@x.com" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "data": true }));
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_send_confirm_email_reports_success() {
    let (router, _repo, mailer) = test_app();
    let (cookie, _id) = register(&router, "a@x.com").await;

    let response = router
        .oneshot(request(
            "POST",
            "/customer/send-confirm-email",
            Some(&cookie),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "data": true }));

    let confirms = mailer
        .sent()
        .iter()
        .filter(|m| matches!(m, SentEmail::Confirm { .. }))
        .count();
    assert!(confirms >= 1);
}

//! HTTP route handlers for the customer account API.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                       - Liveness check
//! GET   /health/ready                 - Readiness check (storage ping)
//!
//! # Customer account (JSON, `{ data: ... }` envelope)
//! GET   /customer                     - Current customer summary or null
//! GET   /customer/details             - Full account view (auth)
//! POST  /customer/register            - Create account, open session
//! POST  /customer/login               - Verify credentials, open session
//! POST  /customer/logout              - Destroy session (auth)
//! POST  /customer/password            - Change password (auth)
//! POST  /customer/reset               - Request password-reset email
//! POST  /customer/send-confirm-email  - Resend confirmation email (auth)
//! POST  /customer/address             - Add shipping address (auth)
//! PUT   /customer/address/{id}        - Edit shipping address (auth)
//! PATCH /customer                     - Update profile fields (auth)
//! ```

pub mod customer;
pub mod views;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;

/// Create the customer account routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(customer::current).patch(customer::update_profile),
        )
        .route("/details", get(customer::details))
        .route("/register", post(customer::register))
        .route("/login", post(customer::login))
        .route("/logout", post(customer::logout))
        .route("/password", post(customer::change_password))
        .route("/reset", post(customer::request_password_reset))
        .route("/send-confirm-email", post(customer::send_confirm_email))
        .route("/address", post(customer::add_address))
        .route("/address/{id}", put(customer::edit_address))
}

/// Create all routes for the server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .nest("/customer", customer_routes())
}

/// Assemble the full application: routes, session layer and state.
///
/// Generic over the session store so the binary runs the `PostgreSQL`
/// store while router tests use the in-memory one.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes().layer(session_layer).with_state(state)
}

/// Liveness probe.
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Readiness probe: verifies the storage backend answers.
async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.customers().ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::error!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

#[cfg(test)]
mod tests;

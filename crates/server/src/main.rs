//! Kram server - customer account API.
//!
//! This binary serves the JSON customer API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework
//! - `PostgreSQL` for customer records and sessions
//! - SMTP (lettre) for confirmation and password-reset email

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kram_server::config::ServerConfig;
use kram_server::db::{self, postgres::PgCustomerRepository};
use kram_server::middleware::create_session_layer;
use kram_server::routes;
use kram_server::services::SmtpMailer;
use kram_server::state::AppState;

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env is read if present)
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize tracing with EnvFilter
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kram_server=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize database connection pool
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // NOTE: Customer migrations are NOT run automatically on startup.
    // Run them explicitly via: sqlx migrate run --source crates/server/migrations

    // Session store keeps its own table and migrates idempotently
    let session_store = PostgresStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .expect("Failed to prepare session store");

    let secure = config.base_url.starts_with("https://");
    let session_layer = create_session_layer(session_store, secure);

    let customers = Arc::new(PgCustomerRepository::new(pool));
    let mailer = Arc::new(SmtpMailer::new(&config.email).expect("Failed to configure mailer"));
    let state = AppState::new(config.base_url.clone(), customers, mailer);

    let app = routes::app(state, session_layer).layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("kram-server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

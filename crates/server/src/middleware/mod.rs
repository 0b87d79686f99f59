//! HTTP middleware: sessions and authentication extractors.

pub mod auth;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_customer, set_current_customer};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};

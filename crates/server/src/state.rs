//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::CustomerRepository;
use crate::services::email::Mailer;
use crate::services::{AuthService, CustomerService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Handlers reach the repository and the
/// mailer through trait objects, so router tests can swap in in-memory
/// implementations.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    base_url: String,
    customers: Arc<dyn CustomerRepository>,
    mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        customers: Arc<dyn CustomerRepository>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                base_url: base_url.into(),
                customers,
                mailer,
            }),
        }
    }

    /// Public base URL used when building email links.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Get a handle to the customer repository.
    #[must_use]
    pub fn customers(&self) -> Arc<dyn CustomerRepository> {
        self.inner.customers.clone()
    }

    /// Build the customer service over the shared repository and mailer.
    #[must_use]
    pub fn customer_service(&self) -> CustomerService {
        CustomerService::new(
            self.inner.customers.clone(),
            self.inner.mailer.clone(),
            self.inner.base_url.clone(),
        )
    }

    /// Build the authentication service over the shared repository.
    #[must_use]
    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.inner.customers.clone())
    }
}

//! Customer persistence.
//!
//! The customer aggregate is stored one record per customer; list-valued
//! fields (addresses, cart, foreign-id lists) live inside the record so
//! that every write is a single-record atomic update. That atomicity is
//! the only concurrency-control primitive this core relies on.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and are run
//! explicitly, never on startup:
//! ```bash
//! sqlx migrate run --source crates/server/migrations
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use kram_core::{CustomerId, Email};

use crate::models::{Customer, NewCustomer, ProfilePatch, ShippingAddress};

pub mod postgres;

#[cfg(test)]
pub mod memory;

/// Errors surfaced by repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// No record matches the given id or email.
    #[error("record not found")]
    NotFound,

    /// A write would violate a uniqueness invariant.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Underlying database failure, including decode errors on stored
    /// JSONB values.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Contract for customer storage.
///
/// All write operations are atomic at single-record granularity; callers
/// must not assume cross-record atomicity.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Get a customer by their ID.
    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    /// Get a customer by their (lowercased) email address.
    async fn get_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError>;

    /// Create a new customer record with `created_at = now`.
    ///
    /// Fails with [`RepositoryError::Conflict`] if the email is already
    /// registered.
    async fn create(&self, new: NewCustomer) -> Result<Customer, RepositoryError>;

    /// Apply a profile patch, leaving every other field untouched.
    ///
    /// Fails with [`RepositoryError::NotFound`] for an unknown id.
    async fn update_profile(
        &self,
        id: CustomerId,
        patch: ProfilePatch,
    ) -> Result<Customer, RepositoryError>;

    /// Replace the stored password hash.
    async fn set_password_hash(
        &self,
        id: CustomerId,
        hash: &str,
    ) -> Result<Customer, RepositoryError>;

    /// Stamp the last successful login time.
    async fn set_last_logged_in(
        &self,
        id: CustomerId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Replace the customer's address list wholesale.
    ///
    /// The service layer computes the new list; persisting it is one
    /// single-record write.
    async fn set_addresses(
        &self,
        id: CustomerId,
        addresses: Vec<ShippingAddress>,
    ) -> Result<Customer, RepositoryError>;

    /// Store the pending email-confirmation token.
    async fn set_confirm_token(&self, id: CustomerId, token: &str) -> Result<(), RepositoryError>;

    /// Store the pending password-reset token.
    async fn set_reset_token(&self, id: CustomerId, token: &str) -> Result<(), RepositoryError>;

    /// Cheap connectivity check used by the readiness endpoint.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Address id generation for new shipping addresses.
///
/// Kept here so both repository implementations and the service agree on
/// the sub-identifier type.
#[must_use]
pub fn new_address_id() -> Uuid {
    Uuid::new_v4()
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

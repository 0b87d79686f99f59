//! Authentication gateway.
//!
//! Verifies credentials against stored argon2id hashes and owns the
//! password rules. Session issuance itself lives in the session
//! middleware; this service only answers "who is this".

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use kram_core::{Email, EmailError};

use crate::db::{CustomerRepository, RepositoryError};
use crate::models::Customer;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during authentication.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Wrong email/password combination, unknown account, locked account
    /// or an account without password login. Deliberately uniform so the
    /// response does not reveal which case applied.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The email is already registered.
    #[error("email already registered")]
    EmailTaken,

    /// The password does not meet requirements.
    #[error("{0}")]
    WeakPassword(String),

    /// The email format is invalid.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password hashing failed.
    #[error("password hashing failed")]
    PasswordHash,

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Authentication service over the customer repository.
#[derive(Clone)]
pub struct AuthService {
    customers: Arc<dyn CustomerRepository>,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(customers: Arc<dyn CustomerRepository>) -> Self {
        Self { customers }
    }

    /// Verify email and password, returning the matching customer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for every failure mode:
    /// unknown email, wrong password, locked account, or an account that
    /// has no password set (third-party registration).
    pub async fn login(&self, email: &str, password: &str) -> Result<Customer, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let customer = self
            .customers
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if customer.is_locked {
            return Err(AuthError::InvalidCredentials);
        }

        let hash = customer
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, hash)?;

        Ok(customer)
    }

    /// Check a password against a customer's stored hash.
    ///
    /// Used by the password-change flow to confirm the current password
    /// before the service stores a new one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on mismatch or when the
    /// account has no password.
    pub fn verify_current_password(
        &self,
        customer: &Customer,
        password: &str,
    ) -> Result<(), AuthError> {
        let hash = customer
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, hash)
    }
}

/// Validate a password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or a malformed
/// stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

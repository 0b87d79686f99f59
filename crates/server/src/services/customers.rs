//! Customer business rules.
//!
//! Registration, password changes, shipping-address management, email
//! confirmation and password-reset requests. Each operation is fail-fast:
//! either the single repository write succeeds or the operation reports
//! failure with the record unchanged. Email dispatch and the last-login
//! stamp are best-effort side effects and never fail the primary
//! operation.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use uuid::Uuid;

use kram_core::{CustomerId, Email};

use crate::db::{CustomerRepository, RepositoryError, new_address_id};
use crate::error::{AppError, Result};
use crate::models::{Customer, NewCustomer, ProfilePatch, ShippingAddress, make_exclusive_default};
use crate::services::auth::{hash_password, validate_password};
use crate::services::email::Mailer;

/// Length of confirmation and reset tokens.
const TOKEN_LENGTH: usize = 32;

/// Input for [`CustomerService::register`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: Email,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Input for adding or editing a shipping address.
#[derive(Debug, Clone, Default)]
pub struct AddressInput {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub city: String,
    pub street_name: String,
    pub carrier_office: String,
    pub is_default: bool,
}

impl AddressInput {
    fn into_address(self, id: Uuid) -> ShippingAddress {
        ShippingAddress {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            city: self.city,
            street_name: self.street_name,
            carrier_office: self.carrier_office,
            is_default: self.is_default,
        }
    }
}

/// Customer service enforcing the aggregate's state-transition rules.
#[derive(Clone)]
pub struct CustomerService {
    customers: Arc<dyn CustomerRepository>,
    mailer: Arc<dyn Mailer>,
    base_url: String,
}

impl CustomerService {
    /// Create a new customer service.
    #[must_use]
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        mailer: Arc<dyn Mailer>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            customers,
            mailer,
            base_url: base_url.into(),
        }
    }

    /// Register a new customer account.
    ///
    /// The confirmation email is dispatched fire-and-forget: a send
    /// failure is logged and does not fail the registration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Duplicate` if the email is already registered,
    /// or a weak-password error before any record is created.
    pub async fn register(&self, input: Registration) -> Result<Customer> {
        validate_password(&input.password)?;
        let password_hash = hash_password(&input.password)?;

        let customer = self
            .customers
            .create(NewCustomer {
                email: Some(input.email),
                password_hash: Some(password_hash),
                first_name: input.first_name,
                last_name: input.last_name,
                is_registered_by_third_party: false,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) => AppError::Duplicate(msg),
                other => AppError::Repository(other),
            })?;

        let service = self.clone();
        let snapshot = customer.clone();
        tokio::spawn(async move {
            if let Err(e) = service.send_email_confirmation(&snapshot).await {
                tracing::warn!(
                    customer_id = %snapshot.id,
                    error = %e,
                    "failed to dispatch confirmation email"
                );
            }
        });

        Ok(customer)
    }

    /// Store a new password for the customer.
    ///
    /// Verifying the current password is the authentication gateway's
    /// job and happens before this call. Other active sessions are not
    /// revoked here.
    ///
    /// # Errors
    ///
    /// Fails on a weak password or an unknown customer id.
    pub async fn update_password(&self, id: CustomerId, new_password: &str) -> Result<Customer> {
        validate_password(new_password)?;
        let hash = hash_password(new_password)?;

        Ok(self.customers.set_password_hash(id, &hash).await?)
    }

    /// Stamp the last successful login time. Best-effort: a failure is
    /// logged and never surfaces to the login response.
    pub async fn update_last_logged_in(&self, id: CustomerId) {
        if let Err(e) = self.customers.set_last_logged_in(id, Utc::now()).await {
            tracing::warn!(customer_id = %id, error = %e, "failed to stamp last login");
        }
    }

    /// Append a new shipping address with a fresh sub-identifier.
    ///
    /// If the input claims the default slot, every other address loses
    /// it first, so at most one address is ever the default.
    ///
    /// # Errors
    ///
    /// Propagates repository failures; no partial state on error.
    pub async fn add_shipping_address(
        &self,
        customer: &Customer,
        input: AddressInput,
    ) -> Result<Customer> {
        let id = new_address_id();
        let is_default = input.is_default;

        let mut addresses = customer.addresses.clone();
        addresses.push(input.into_address(id));
        if is_default {
            make_exclusive_default(&mut addresses, id);
        }

        Ok(self.customers.set_addresses(customer.id, addresses).await?)
    }

    /// Replace the fields of an existing shipping address.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if `address_id` does not belong to
    /// this customer; the address list is left unchanged.
    pub async fn edit_shipping_address(
        &self,
        customer: &Customer,
        address_id: Uuid,
        input: AddressInput,
    ) -> Result<Customer> {
        let mut addresses = customer.addresses.clone();
        let is_default = input.is_default;

        let slot = addresses
            .iter_mut()
            .find(|a| a.id == address_id)
            .ok_or_else(|| AppError::NotFound(format!("address {address_id}")))?;
        *slot = input.into_address(address_id);

        if is_default {
            make_exclusive_default(&mut addresses, address_id);
        }

        Ok(self.customers.set_addresses(customer.id, addresses).await?)
    }

    /// Apply a profile patch.
    ///
    /// [`ProfilePatch`] cannot express identity, email, flags or the
    /// financial aggregates, so those fields can never change here.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` for an unknown customer id.
    pub async fn update_profile(&self, id: CustomerId, patch: ProfilePatch) -> Result<Customer> {
        Ok(self.customers.update_profile(id, patch).await?)
    }

    /// Issue a confirmation token and email it to the customer.
    ///
    /// Idempotent from the caller's view: invoking again before the
    /// customer confirms simply issues a new token and resends, with no
    /// throttling. Accounts without an email are a no-op.
    ///
    /// # Errors
    ///
    /// Propagates the token-persistence failure; a mailer failure is
    /// logged and swallowed (best-effort dispatch).
    pub async fn send_email_confirmation(&self, customer: &Customer) -> Result<()> {
        let Some(email) = customer.email.clone() else {
            tracing::debug!(customer_id = %customer.id, "no email on record, skipping confirmation");
            return Ok(());
        };

        let token = generate_token();
        self.customers
            .set_confirm_token(customer.id, &token)
            .await?;

        let link = format!("{}/customer/confirm-email?token={token}", self.base_url);
        if let Err(e) = self.mailer.send_confirm_email(&email, &link).await {
            tracing::warn!(customer_id = %customer.id, error = %e, "failed to send confirmation email");
        }

        Ok(())
    }

    /// Handle a password-reset request for the given email.
    ///
    /// Unknown emails return the same success shape as registered ones,
    /// so the endpoint cannot be used to probe which addresses exist.
    ///
    /// # Errors
    ///
    /// Propagates the token-persistence failure; a mailer failure is
    /// logged and swallowed.
    pub async fn reset_password_by_request(&self, email: &Email) -> Result<()> {
        let Some(customer) = self.customers.get_by_email(email).await? else {
            return Ok(());
        };

        let token = generate_token();
        self.customers.set_reset_token(customer.id, &token).await?;

        let link = format!("{}/customer/reset-password?token={token}", self.base_url);
        if let Err(e) = self.mailer.send_password_reset(email, &link).await {
            tracing::warn!(customer_id = %customer.id, error = %e, "failed to send reset email");
        }

        Ok(())
    }
}

/// Generate a random URL-safe token for confirmation/reset links.
fn generate_token() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

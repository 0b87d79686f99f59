//! In-memory customer repository used by tests.
//!
//! Implements the same contract as the `PostgreSQL` repository: writes are
//! atomic per record (one mutex-guarded map mutation) and email
//! uniqueness applies to accounts that have an email; email-less
//! third-party accounts never collide.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use kram_core::{CustomerId, Email};

use super::{CustomerRepository, RepositoryError};
use crate::models::{Customer, NewCustomer, ProfilePatch, ShippingAddress};

#[derive(Default)]
struct Inner {
    next_id: i64,
    customers: HashMap<CustomerId, Customer>,
}

/// Map-backed repository for service and router tests.
#[derive(Default)]
pub struct InMemoryCustomerRepository {
    inner: Mutex<Inner>,
}

impl InMemoryCustomerRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        f(&mut inner)
    }

    /// Lock an account directly, bypassing the repository contract.
    /// Locking is an operator action with no customer-facing endpoint.
    pub fn set_locked(&self, id: CustomerId) {
        self.with_inner(|inner| {
            if let Some(c) = inner.customers.get_mut(&id) {
                c.is_locked = true;
            }
        });
    }

    fn update_record<T>(
        &self,
        id: CustomerId,
        f: impl FnOnce(&mut Customer) -> T,
    ) -> Result<T, RepositoryError> {
        self.with_inner(|inner| {
            inner
                .customers
                .get_mut(&id)
                .map(f)
                .ok_or(RepositoryError::NotFound)
        })
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.with_inner(|inner| inner.customers.get(&id).cloned()))
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.with_inner(|inner| {
            inner
                .customers
                .values()
                .find(|c| c.email.as_ref() == Some(email))
                .cloned()
        }))
    }

    async fn create(&self, new: NewCustomer) -> Result<Customer, RepositoryError> {
        self.with_inner(|inner| {
            if let Some(ref email) = new.email
                && inner
                    .customers
                    .values()
                    .any(|c| c.email.as_ref() == Some(email))
            {
                return Err(RepositoryError::Conflict(
                    "email already registered".to_owned(),
                ));
            }

            inner.next_id += 1;
            let customer = Customer {
                id: CustomerId::new(inner.next_id),
                email: new.email,
                password_hash: new.password_hash,
                first_name: new.first_name,
                last_name: new.last_name,
                phone_number: String::new(),
                note: String::new(),
                created_at: Utc::now(),
                last_logged_in: None,
                is_locked: false,
                is_email_confirmed: false,
                is_phone_number_confirmed: false,
                is_registered_by_third_party: new.is_registered_by_third_party,
                addresses: Vec::new(),
                review_ids: Vec::new(),
                order_ids: Vec::new(),
                wishlist_product_ids: Vec::new(),
                discount_percent: 0.0,
                total_orders_count: 0,
                total_orders_cost: Decimal::ZERO,
                cart: Vec::new(),
                confirm_token: None,
                reset_token: None,
            };
            inner.customers.insert(customer.id, customer.clone());
            Ok(customer)
        })
    }

    async fn update_profile(
        &self,
        id: CustomerId,
        patch: ProfilePatch,
    ) -> Result<Customer, RepositoryError> {
        self.update_record(id, |c| {
            if let Some(first_name) = patch.first_name {
                c.first_name = first_name;
            }
            if let Some(last_name) = patch.last_name {
                c.last_name = last_name;
            }
            if let Some(phone_number) = patch.phone_number {
                c.phone_number = phone_number;
            }
            c.clone()
        })
    }

    async fn set_password_hash(
        &self,
        id: CustomerId,
        hash: &str,
    ) -> Result<Customer, RepositoryError> {
        self.update_record(id, |c| {
            c.password_hash = Some(hash.to_owned());
            c.reset_token = None;
            c.clone()
        })
    }

    async fn set_last_logged_in(
        &self,
        id: CustomerId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.update_record(id, |c| c.last_logged_in = Some(at))
    }

    async fn set_addresses(
        &self,
        id: CustomerId,
        addresses: Vec<ShippingAddress>,
    ) -> Result<Customer, RepositoryError> {
        self.update_record(id, |c| {
            c.addresses = addresses;
            c.clone()
        })
    }

    async fn set_confirm_token(&self, id: CustomerId, token: &str) -> Result<(), RepositoryError> {
        self.update_record(id, |c| c.confirm_token = Some(token.to_owned()))
    }

    async fn set_reset_token(&self, id: CustomerId, token: &str) -> Result<(), RepositoryError> {
        self.update_record(id, |c| c.reset_token = Some(token.to_owned()))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

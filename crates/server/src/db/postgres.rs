//! `PostgreSQL`-backed customer repository.
//!
//! One `customer` row per aggregate. Addresses, cart lines and foreign-id
//! lists are JSONB columns, so every repository write below is a single
//! `UPDATE`/`INSERT` on one row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use kram_core::{CustomerId, Email, OrderId, ProductId, ReviewId};

use super::{CustomerRepository, RepositoryError};
use crate::models::{CartItem, Customer, NewCustomer, ProfilePatch, ShippingAddress};

/// Repository for customer records in `PostgreSQL`.
#[derive(Clone)]
pub struct PgCustomerRepository {
    pool: PgPool,
}

impl PgCustomerRepository {
    /// Create a new repository over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw row shape; converted into the domain [`Customer`].
#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    email: Option<Email>,
    password_hash: Option<String>,
    first_name: String,
    last_name: String,
    phone_number: String,
    note: String,
    created_at: DateTime<Utc>,
    last_logged_in: Option<DateTime<Utc>>,
    is_locked: bool,
    is_email_confirmed: bool,
    is_phone_number_confirmed: bool,
    is_registered_by_third_party: bool,
    addresses: Json<Vec<ShippingAddress>>,
    review_ids: Json<Vec<ReviewId>>,
    order_ids: Json<Vec<OrderId>>,
    wishlist_product_ids: Json<Vec<ProductId>>,
    discount_percent: f64,
    total_orders_count: i64,
    total_orders_cost: Decimal,
    cart: Json<Vec<CartItem>>,
    confirm_token: Option<String>,
    reset_token: Option<String>,
}

impl From<CustomerRow> for Customer {
    fn from(r: CustomerRow) -> Self {
        Self {
            id: r.id,
            email: r.email,
            password_hash: r.password_hash,
            first_name: r.first_name,
            last_name: r.last_name,
            phone_number: r.phone_number,
            note: r.note,
            created_at: r.created_at,
            last_logged_in: r.last_logged_in,
            is_locked: r.is_locked,
            is_email_confirmed: r.is_email_confirmed,
            is_phone_number_confirmed: r.is_phone_number_confirmed,
            is_registered_by_third_party: r.is_registered_by_third_party,
            addresses: r.addresses.0,
            review_ids: r.review_ids.0,
            order_ids: r.order_ids.0,
            wishlist_product_ids: r.wishlist_product_ids.0,
            discount_percent: r.discount_percent,
            total_orders_count: r.total_orders_count,
            total_orders_cost: r.total_orders_cost,
            cart: r.cart.0,
            confirm_token: r.confirm_token,
            reset_token: r.reset_token,
        }
    }
}

/// Shared column list so every query returns the same row shape.
const COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone_number, note, \
    created_at, last_logged_in, is_locked, is_email_confirmed, is_phone_number_confirmed, \
    is_registered_by_third_party, addresses, review_ids, order_ids, wishlist_product_ids, \
    discount_percent, total_orders_count, total_orders_cost, cart, confirm_token, reset_token";

fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict("email already registered".to_owned());
    }
    RepositoryError::Database(e)
}

#[async_trait]
impl CustomerRepository for PgCustomerRepository {
    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {COLUMNS} FROM customer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {COLUMNS} FROM customer WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    async fn create(&self, new: NewCustomer) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "INSERT INTO customer \
                (email, password_hash, first_name, last_name, is_registered_by_third_party) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        ))
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.is_registered_by_third_party)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(row.into())
    }

    async fn update_profile(
        &self,
        id: CustomerId,
        patch: ProfilePatch,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "UPDATE customer SET \
                first_name = COALESCE($2, first_name), \
                last_name = COALESCE($3, last_name), \
                phone_number = COALESCE($4, phone_number) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(patch.first_name)
        .bind(patch.last_name)
        .bind(patch.phone_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::from).ok_or(RepositoryError::NotFound)
    }

    async fn set_password_hash(
        &self,
        id: CustomerId,
        hash: &str,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "UPDATE customer SET password_hash = $2, reset_token = NULL \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::from).ok_or(RepositoryError::NotFound)
    }

    async fn set_last_logged_in(
        &self,
        id: CustomerId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE customer SET last_logged_in = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn set_addresses(
        &self,
        id: CustomerId,
        addresses: Vec<ShippingAddress>,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "UPDATE customer SET addresses = $2 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(Json(addresses))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::from).ok_or(RepositoryError::NotFound)
    }

    async fn set_confirm_token(&self, id: CustomerId, token: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE customer SET confirm_token = $2 WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn set_reset_token(&self, id: CustomerId, token: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE customer SET reset_token = $2 WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

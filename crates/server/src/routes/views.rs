//! Response projections of the customer aggregate.
//!
//! The aggregate is never serialized directly. Anonymous/self responses
//! use [`CustomerSummary`]; the authenticated details endpoint uses
//! [`CustomerDetails`]. Neither projection can carry the password hash,
//! the internal note or the pending tokens, because the structs have no
//! such fields.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use kram_core::{CustomerId, Email, OrderId, ProductId, ReviewId};

use crate::models::{CartItem, Customer, ShippingAddress};

/// Uniform success envelope: every 2xx body is `{ "data": <payload> }`.
#[derive(Debug, Serialize)]
pub struct ResponseBody<T> {
    pub data: T,
}

/// Public view of a customer, safe for the account holder and for the
/// "who am I" endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<Email>,
    pub phone_number: String,
    pub is_email_confirmed: bool,
    pub is_phone_number_confirmed: bool,
    pub is_registered_by_third_party: bool,
}

impl From<&Customer> for CustomerSummary {
    fn from(c: &Customer) -> Self {
        Self {
            id: c.id,
            first_name: c.first_name.clone(),
            last_name: c.last_name.clone(),
            email: c.email.clone(),
            phone_number: c.phone_number.clone(),
            is_email_confirmed: c.is_email_confirmed,
            is_phone_number_confirmed: c.is_phone_number_confirmed,
            is_registered_by_third_party: c.is_registered_by_third_party,
        }
    }
}

/// Full account view for the authenticated customer. Extends the
/// summary with addresses, order history references, the cart and the
/// discount standing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<Email>,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
    pub last_logged_in: Option<DateTime<Utc>>,
    pub is_email_confirmed: bool,
    pub is_phone_number_confirmed: bool,
    pub is_registered_by_third_party: bool,
    pub addresses: Vec<ShippingAddress>,
    pub review_ids: Vec<ReviewId>,
    pub order_ids: Vec<OrderId>,
    pub wishlist_product_ids: Vec<ProductId>,
    pub discount_percent: f64,
    pub total_orders_count: i64,
    pub total_orders_cost: Decimal,
    pub cart: Vec<CartItem>,
}

impl From<&Customer> for CustomerDetails {
    fn from(c: &Customer) -> Self {
        Self {
            id: c.id,
            first_name: c.first_name.clone(),
            last_name: c.last_name.clone(),
            email: c.email.clone(),
            phone_number: c.phone_number.clone(),
            created_at: c.created_at,
            last_logged_in: c.last_logged_in,
            is_email_confirmed: c.is_email_confirmed,
            is_phone_number_confirmed: c.is_phone_number_confirmed,
            is_registered_by_third_party: c.is_registered_by_third_party,
            addresses: c.addresses.clone(),
            review_ids: c.review_ids.clone(),
            order_ids: c.order_ids.clone(),
            wishlist_product_ids: c.wishlist_product_ids.clone(),
            discount_percent: c.discount_percent,
            total_orders_count: c.total_orders_count,
            total_orders_cost: c.total_orders_cost,
            cart: c.cart.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn customer() -> Customer {
        Customer {
            id: CustomerId::new(7),
            email: Some(Email::parse("a@x.com").unwrap()),
            password_hash: Some("$argon2id$secret".to_owned()),
            first_name: "Anna".to_owned(),
            last_name: "Koval".to_owned(),
            phone_number: String::new(),
            note: "internal note".to_owned(),
            created_at: Utc::now(),
            last_logged_in: None,
            is_locked: false,
            is_email_confirmed: true,
            is_phone_number_confirmed: false,
            is_registered_by_third_party: false,
            addresses: Vec::new(),
            review_ids: Vec::new(),
            order_ids: Vec::new(),
            wishlist_product_ids: Vec::new(),
            discount_percent: 0.0,
            total_orders_count: 0,
            total_orders_cost: Decimal::ZERO,
            cart: Vec::new(),
            confirm_token: Some("token".to_owned()),
            reset_token: None,
        }
    }

    #[test]
    fn test_summary_never_leaks_secrets() {
        let json = serde_json::to_string(&CustomerSummary::from(&customer())).unwrap();
        assert!(json.contains("\"firstName\":\"Anna\""));
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("internal note"));
        assert!(!json.contains("token"));
    }

    #[test]
    fn test_details_uses_camel_case_keys() {
        let json = serde_json::to_string(&CustomerDetails::from(&customer())).unwrap();
        assert!(json.contains("\"lastLoggedIn\":null"));
        assert!(json.contains("\"totalOrdersCost\":\"0\""));
        assert!(!json.contains("argon2id"));
    }
}

//! Customer aggregate types.
//!
//! These types represent validated domain objects separate from database
//! row types. The `Customer` is the aggregate root; `ShippingAddress` and
//! `CartItem` are sub-records owned exclusively by their customer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kram_core::{CustomerId, Email, OrderId, ProductId, ReviewId, VariantId};

/// A customer account (domain type).
#[derive(Debug, Clone)]
pub struct Customer {
    /// Unique customer ID, immutable once assigned.
    pub id: CustomerId,
    /// Login email, lowercase. `None` for third-party registrations that
    /// have not completed their profile yet.
    pub email: Option<Email>,
    /// Argon2id password hash. `None` for accounts without password login.
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    /// Free-text internal note, never exposed through the API views.
    pub note: String,
    /// When the account was created. Never mutated.
    pub created_at: DateTime<Utc>,
    /// Stamped on each successful login; `None` until the first one.
    pub last_logged_in: Option<DateTime<Utc>>,
    pub is_locked: bool,
    pub is_email_confirmed: bool,
    pub is_phone_number_confirmed: bool,
    pub is_registered_by_third_party: bool,
    /// Shipping addresses. At most one entry has `is_default == true`;
    /// the service layer maintains that invariant, not storage.
    pub addresses: Vec<ShippingAddress>,
    pub review_ids: Vec<ReviewId>,
    pub order_ids: Vec<OrderId>,
    pub wishlist_product_ids: Vec<ProductId>,
    /// Discount earned from order history, maintained by order-completion
    /// events outside this core.
    pub discount_percent: f64,
    pub total_orders_count: i64,
    pub total_orders_cost: Decimal,
    /// In-progress, unplaced order lines.
    pub cart: Vec<CartItem>,
    /// Pending email-confirmation token, if one has been issued.
    pub confirm_token: Option<String>,
    /// Pending password-reset token, if one has been issued.
    pub reset_token: Option<String>,
}

impl Customer {
    /// Returns the address with the given sub-id, if it belongs to this
    /// customer.
    #[must_use]
    pub fn address(&self, address_id: Uuid) -> Option<&ShippingAddress> {
        self.addresses.iter().find(|a| a.id == address_id)
    }

    /// Returns the default shipping address, if any.
    #[must_use]
    pub fn default_address(&self) -> Option<&ShippingAddress> {
        self.addresses.iter().find(|a| a.is_default)
    }
}

/// A shipping address owned by a customer.
///
/// Lifecycle-bound to its parent: nothing outside the aggregate holds a
/// reference to an address independent of its customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    /// Unique within the customer's address list.
    pub id: Uuid,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    pub city: String,
    #[serde(default)]
    pub street_name: String,
    /// Pickup office reference of the delivery carrier, free-form.
    #[serde(default)]
    pub carrier_office: String,
    #[serde(default)]
    pub is_default: bool,
}

/// An order line item sitting in the customer's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub name: String,
    pub price: Decimal,
    pub qty: u32,
    /// Line total (`price * qty`), denormalized like the rest of the
    /// order pipeline expects.
    pub cost: Decimal,
}

/// Fields required to create a new customer record.
///
/// `created_at` is stamped by the repository; flags start at their
/// defaults.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub email: Option<Email>,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub is_registered_by_third_party: bool,
}

/// Profile fields a customer may change about themselves.
///
/// Deliberately narrow: identity, email, flags and the financial
/// aggregates are not representable here, so a profile update can never
/// touch them.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

impl ProfilePatch {
    /// Whether the patch changes anything at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone_number.is_none()
    }
}

/// Clears `is_default` on every address except `keep`.
///
/// Used when an added or edited address claims the default slot, so the
/// at-most-one-default invariant holds regardless of the prior state.
pub fn make_exclusive_default(addresses: &mut [ShippingAddress], keep: Uuid) {
    for address in addresses.iter_mut() {
        address.is_default = address.id == keep;
    }
}

//! Domain models for the customer backend.

pub mod customer;
pub mod session;

pub use customer::{
    CartItem, Customer, NewCustomer, ProfilePatch, ShippingAddress, make_exclusive_default,
};
pub use session::{CurrentCustomer, keys as session_keys};

//! Kram Core - Shared domain types.
//!
//! This crate provides the common types used by the Kram backend:
//! type-safe entity IDs and the validated email address used as the
//! customer login key.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

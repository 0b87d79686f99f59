//! Kram server library.
//!
//! Customer account backend: registration, session login, profile and
//! shipping-address management, email confirmation and password reset.
//! Exposed as a library so the router tests can assemble the full
//! application without a running binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

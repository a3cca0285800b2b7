//! # wishlist_core
//!
//! Core domain logic for the gift registry: token issuing and revocation,
//! the request auth gate, ownership policy, and the record store.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

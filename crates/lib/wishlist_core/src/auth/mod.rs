//! Authentication and authorization logic.
//!
//! Provides password hashing, token issuance and verification, the token
//! blacklist, the per-request auth gate and the ownership policy. Nothing in
//! here touches HTTP types; `wishlist_api` maps these errors to responses.

pub mod blacklist;
pub mod gate;
pub mod jwt;
pub mod password;
pub mod policy;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad name/password pair. Deliberately carries no detail so unknown
    /// names and wrong passwords look identical.
    #[error("Invalid credentials")]
    CredentialError,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Registration with a name that already exists.
    #[error("User already exists")]
    NameTaken,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

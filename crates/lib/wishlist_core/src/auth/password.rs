//! Password hashing via bcrypt.

use super::AuthError;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt at the given cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// Hash compared against when the login name does not exist, so both failure
/// paths pay for one bcrypt verification. Build it at the same cost as real
/// password hashes.
#[derive(Debug, Clone)]
pub struct DummyHash(String);

impl DummyHash {
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        hash_password("wishlist-dummy-password", cost).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Burn one verification. Never matches.
    pub fn verify(&self, password: &str) -> bool {
        let _ = bcrypt::verify(password, &self.0);
        false
    }
}

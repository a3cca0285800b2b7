//! Persistence seam.
//!
//! Handlers talk to a [`WishlistStore`] trait object so the relational backend
//! can be swapped for the in-memory one in tests. Each method is a single
//! atomic unit: backends run multi-step writes in one transaction (Postgres)
//! or under one write guard (memory).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::auth::{Role, User, UserWithPassword};
use crate::models::gift::{Claim, Gift, GiftFields};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced row vanished (or never existed) at commit time.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness guard tripped: duplicate name, or a second live claim.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Record CRUD for users, gifts and claims.
#[async_trait]
pub trait WishlistStore: Send + Sync {
    // Users

    /// Insert a user. The first user ever stored gets [`Role::Admin`], every
    /// later one [`Role::User`]; the role is decided in the same atomic unit
    /// as the insert. [`StoreError::Conflict`] if the name is taken.
    async fn create_user(&self, name: &str, password_hash: &str) -> StoreResult<User>;

    async fn find_user_by_name(&self, name: &str) -> StoreResult<Option<UserWithPassword>>;

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Rename and/or re-role a user. `None` if missing,
    /// [`StoreError::Conflict`] if the new name belongs to someone else.
    async fn update_user(&self, id: i64, name: &str, role: Role) -> StoreResult<Option<User>>;

    /// Delete a user with their gifts (and claims on those gifts) and their
    /// own claims, resetting the taken flag of every gift they had claimed.
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;

    // Gifts

    async fn list_gifts(&self) -> StoreResult<Vec<Gift>>;

    async fn list_gifts_for_owner(&self, owner_id: i64) -> StoreResult<Vec<Gift>>;

    async fn get_gift(&self, id: i64) -> StoreResult<Option<Gift>>;

    /// [`StoreError::NotFound`] if the owner no longer exists.
    async fn create_gift(&self, owner_id: i64, fields: &GiftFields) -> StoreResult<Gift>;

    /// Overwrite the owner-editable fields. Never touches `is_taken`.
    async fn update_gift(&self, id: i64, fields: &GiftFields) -> StoreResult<Option<Gift>>;

    /// Delete a gift and any claim on it.
    async fn delete_gift(&self, id: i64) -> StoreResult<bool>;

    // Claims

    /// Atomically: the gift must exist ([`StoreError::NotFound`]) and be
    /// untaken ([`StoreError::Conflict`]); insert the claim under the
    /// one-claim-per-gift guard and set the taken flag.
    async fn create_claim(&self, gift_id: i64, volunteer_id: i64) -> StoreResult<Claim>;

    async fn list_claims_for(&self, volunteer_id: i64) -> StoreResult<Vec<Claim>>;

    async fn get_claim(&self, id: i64) -> StoreResult<Option<Claim>>;

    /// Delete `volunteer_id`'s claim `id` and reset the gift's taken flag in
    /// the same unit. `false` if no such claim belongs to that volunteer.
    async fn delete_claim(&self, id: i64, volunteer_id: i64) -> StoreResult<bool>;
}

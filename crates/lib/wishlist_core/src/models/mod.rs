//! Domain models shared by the store, the auth layer and the HTTP API.

pub mod auth;
pub mod gift;

pub use auth::{Identity, Role, TokenClaims, User, UserWithPassword};
pub use gift::{Claim, Gift, GiftFields};

//! Request and response bodies.
//!
//! Wire shapes only; conversions from the core domain types live here too so
//! handlers stay one-liners. Nothing in this module ever carries a claimant's
//! identity alongside a gift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wishlist_core::models::{Claim, Gift, GiftFields, Role, User};

/// Error body returned for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub user_id: i64,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReadDto {
    pub id: i64,
    pub name: String,
}

impl From<User> for UserReadDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
        }
    }
}

/// Admin view of a user after an update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetailDto {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

impl From<User> for UserDetailDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            role: u.role,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// `"user"` or `"admin"`, case-insensitive.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWishlistReadDto {
    pub id: i64,
    pub name: String,
    pub gifts: Vec<GiftReadDto>,
}

// ---------------------------------------------------------------------------
// Gifts
// ---------------------------------------------------------------------------

/// Body for gift create and update. The taken flag and owner are not
/// accepted from clients.
#[derive(Debug, Clone, Deserialize)]
pub struct GiftWriteRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub category: Option<String>,
}

impl GiftWriteRequest {
    /// Trimmed fields, with blank optionals collapsed to `None`.
    pub fn into_fields(self) -> GiftFields {
        fn blank_to_none(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        GiftFields {
            title: self.title.trim().to_string(),
            description: blank_to_none(self.description),
            link: blank_to_none(self.link),
            category: blank_to_none(self.category),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftReadDto {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub category: Option<String>,
    pub is_taken: bool,
    pub user_id: i64,
}

impl From<Gift> for GiftReadDto {
    fn from(g: Gift) -> Self {
        Self {
            id: g.id,
            title: g.title,
            description: g.description,
            link: g.link,
            category: g.category,
            is_taken: g.is_taken,
            user_id: g.owner_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Volunteers (claims)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerCreateRequest {
    pub gift_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerReadDto {
    pub id: i64,
    pub gift_id: i64,
    pub volunteer_user_id: i64,
}

impl From<Claim> for VolunteerReadDto {
    fn from(c: Claim) -> Self {
        Self {
            id: c.id,
            gift_id: c.gift_id,
            volunteer_user_id: c.volunteer_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

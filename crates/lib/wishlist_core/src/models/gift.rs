//! Gift and claim (volunteer record) domain models.

use serde::{Deserialize, Serialize};

/// A wishlist item owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gift {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub category: Option<String>,
    /// Mirrors "a live claim exists for this gift".
    pub is_taken: bool,
    pub owner_id: i64,
}

/// Owner-editable gift fields. The taken flag is deliberately absent: it only
/// changes through the claim workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GiftFields {
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub category: Option<String>,
}

/// Links one gift to the user who committed to buying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: i64,
    pub gift_id: i64,
    pub volunteer_id: i64,
}

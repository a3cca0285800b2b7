//! Ownership and role rules applied by resource handlers.
//!
//! Anything protected by ownership answers a stranger with
//! [`Denial::NotFound`], so a caller can never tell "exists but not yours"
//! apart from "does not exist". Only role checks answer
//! [`Denial::Forbidden`].

use thiserror::Error;

use crate::models::auth::{Identity, Role};
use crate::models::gift::{Claim, Gift};

/// Outcome of a failed policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
}

/// Gift update/delete: owner only.
pub fn can_mutate_gift(identity: &Identity, gift: &Gift) -> Result<(), Denial> {
    if gift.owner_id == identity.user_id {
        Ok(())
    } else {
        Err(Denial::NotFound)
    }
}

/// Claim read/delete: claimant only.
pub fn can_access_claim(identity: &Identity, claim: &Claim) -> Result<(), Denial> {
    if claim.volunteer_id == identity.user_id {
        Ok(())
    } else {
        Err(Denial::NotFound)
    }
}

/// Whether `identity` may claim `gift` at all. Owners cannot volunteer for
/// their own wishes; the taken flag is checked separately by the caller and
/// again by the store at commit time.
pub fn can_claim_gift(identity: &Identity, gift: &Gift) -> bool {
    gift.owner_id != identity.user_id
}

/// User administration: admin role only.
pub fn can_administer_users(identity: &Identity) -> Result<(), Denial> {
    match identity.role {
        Role::Admin => Ok(()),
        Role::User => Err(Denial::Forbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn identity(user_id: i64, role: Role) -> Identity {
        Identity {
            user_id,
            name: format!("user{user_id}"),
            role,
            token_id: "jti".into(),
            expires_at: Utc::now(),
        }
    }

    fn gift(owner_id: i64) -> Gift {
        Gift {
            id: 1,
            title: "Kettle".into(),
            description: None,
            link: None,
            category: None,
            is_taken: false,
            owner_id,
        }
    }

    #[test]
    fn only_owner_mutates_gift_and_strangers_see_not_found() {
        assert_eq!(can_mutate_gift(&identity(1, Role::User), &gift(1)), Ok(()));
        assert_eq!(
            can_mutate_gift(&identity(2, Role::User), &gift(1)),
            Err(Denial::NotFound)
        );
        // Admins get no special gift rights.
        assert_eq!(
            can_mutate_gift(&identity(3, Role::Admin), &gift(1)),
            Err(Denial::NotFound)
        );
    }

    #[test]
    fn only_claimant_reads_claim() {
        let claim = Claim {
            id: 9,
            gift_id: 1,
            volunteer_id: 5,
        };
        assert_eq!(can_access_claim(&identity(5, Role::User), &claim), Ok(()));
        assert_eq!(
            can_access_claim(&identity(1, Role::User), &claim),
            Err(Denial::NotFound)
        );
    }

    #[test]
    fn owner_cannot_claim_own_gift() {
        assert!(!can_claim_gift(&identity(1, Role::User), &gift(1)));
        assert!(can_claim_gift(&identity(2, Role::User), &gift(1)));
    }

    #[test]
    fn administration_requires_admin_role() {
        assert_eq!(can_administer_users(&identity(1, Role::Admin)), Ok(()));
        assert_eq!(
            can_administer_users(&identity(1, Role::User)),
            Err(Denial::Forbidden)
        );
    }
}

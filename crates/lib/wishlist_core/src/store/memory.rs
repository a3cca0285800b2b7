//! In-process store backed by ordered maps behind one `RwLock`.
//!
//! Every mutating method takes the write guard once and does all of its work
//! before releasing it, which gives each call the same all-or-nothing shape a
//! database transaction would. Used by tests and for running without Postgres.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, StoreResult, WishlistStore};
use crate::models::auth::{Role, User, UserWithPassword};
use crate::models::gift::{Claim, Gift, GiftFields};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, UserWithPassword>,
    gifts: BTreeMap<i64, Gift>,
    claims: BTreeMap<i64, Claim>,
    /// gift_id -> claim_id; at most one claim per gift.
    claim_by_gift: HashMap<i64, i64>,
    next_user_id: i64,
    next_gift_id: i64,
    next_claim_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.user.name == name && Some(u.user.id) != except)
    }

    fn remove_claim(&mut self, claim_id: i64) -> Option<Claim> {
        let claim = self.claims.remove(&claim_id)?;
        self.claim_by_gift.remove(&claim.gift_id);
        if let Some(gift) = self.gifts.get_mut(&claim.gift_id) {
            gift.is_taken = false;
        }
        Some(claim)
    }

    fn remove_gift(&mut self, gift_id: i64) -> bool {
        if let Some(claim_id) = self.claim_by_gift.remove(&gift_id) {
            self.claims.remove(&claim_id);
        }
        self.gifts.remove(&gift_id).is_some()
    }
}

/// [`WishlistStore`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WishlistStore for MemoryStore {
    async fn create_user(&self, name: &str, password_hash: &str) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.name_taken(name, None) {
            return Err(StoreError::Conflict(format!("user name {name} is taken")));
        }
        let role = if t.users.is_empty() {
            Role::Admin
        } else {
            Role::User
        };
        let id = Tables::next_id(&mut t.next_user_id);
        let user = User {
            id,
            name: name.to_string(),
            role,
        };
        t.users.insert(
            id,
            UserWithPassword {
                user: user.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(user)
    }

    async fn find_user_by_name(&self, name: &str) -> StoreResult<Option<UserWithPassword>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.user.name == name).cloned())
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.get(&id).map(|u| u.user.clone()))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().map(|u| u.user.clone()).collect())
    }

    async fn update_user(&self, id: i64, name: &str, role: Role) -> StoreResult<Option<User>> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&id) {
            return Ok(None);
        }
        if t.name_taken(name, Some(id)) {
            return Err(StoreError::Conflict(format!("user name {name} is taken")));
        }
        let Some(row) = t.users.get_mut(&id) else {
            return Ok(None);
        };
        row.user.name = name.to_string();
        row.user.role = role;
        Ok(Some(row.user.clone()))
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if t.users.remove(&id).is_none() {
            return Ok(false);
        }

        // Their claims go first so the claimed gifts become available again.
        let own_claims: Vec<i64> = t
            .claims
            .values()
            .filter(|c| c.volunteer_id == id)
            .map(|c| c.id)
            .collect();
        for claim_id in own_claims {
            t.remove_claim(claim_id);
        }

        let own_gifts: Vec<i64> = t
            .gifts
            .values()
            .filter(|g| g.owner_id == id)
            .map(|g| g.id)
            .collect();
        for gift_id in own_gifts {
            t.remove_gift(gift_id);
        }
        Ok(true)
    }

    async fn list_gifts(&self) -> StoreResult<Vec<Gift>> {
        let t = self.tables.read().await;
        Ok(t.gifts.values().cloned().collect())
    }

    async fn list_gifts_for_owner(&self, owner_id: i64) -> StoreResult<Vec<Gift>> {
        let t = self.tables.read().await;
        Ok(t.gifts
            .values()
            .filter(|g| g.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn get_gift(&self, id: i64) -> StoreResult<Option<Gift>> {
        let t = self.tables.read().await;
        Ok(t.gifts.get(&id).cloned())
    }

    async fn create_gift(&self, owner_id: i64, fields: &GiftFields) -> StoreResult<Gift> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&owner_id) {
            return Err(StoreError::NotFound(format!("user {owner_id}")));
        }
        let id = Tables::next_id(&mut t.next_gift_id);
        let gift = Gift {
            id,
            title: fields.title.clone(),
            description: fields.description.clone(),
            link: fields.link.clone(),
            category: fields.category.clone(),
            is_taken: false,
            owner_id,
        };
        t.gifts.insert(id, gift.clone());
        Ok(gift)
    }

    async fn update_gift(&self, id: i64, fields: &GiftFields) -> StoreResult<Option<Gift>> {
        let mut t = self.tables.write().await;
        let Some(gift) = t.gifts.get_mut(&id) else {
            return Ok(None);
        };
        gift.title = fields.title.clone();
        gift.description = fields.description.clone();
        gift.link = fields.link.clone();
        gift.category = fields.category.clone();
        Ok(Some(gift.clone()))
    }

    async fn delete_gift(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        Ok(t.remove_gift(id))
    }

    async fn create_claim(&self, gift_id: i64, volunteer_id: i64) -> StoreResult<Claim> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&volunteer_id) {
            return Err(StoreError::NotFound(format!("user {volunteer_id}")));
        }
        let Some(gift) = t.gifts.get(&gift_id) else {
            return Err(StoreError::NotFound(format!("gift {gift_id}")));
        };
        if gift.is_taken || t.claim_by_gift.contains_key(&gift_id) {
            return Err(StoreError::Conflict(format!("gift {gift_id} is already taken")));
        }

        let id = Tables::next_id(&mut t.next_claim_id);
        let claim = Claim {
            id,
            gift_id,
            volunteer_id,
        };
        t.claims.insert(id, claim.clone());
        t.claim_by_gift.insert(gift_id, id);
        if let Some(gift) = t.gifts.get_mut(&gift_id) {
            gift.is_taken = true;
        }
        Ok(claim)
    }

    async fn list_claims_for(&self, volunteer_id: i64) -> StoreResult<Vec<Claim>> {
        let t = self.tables.read().await;
        Ok(t.claims
            .values()
            .filter(|c| c.volunteer_id == volunteer_id)
            .cloned()
            .collect())
    }

    async fn get_claim(&self, id: i64) -> StoreResult<Option<Claim>> {
        let t = self.tables.read().await;
        Ok(t.claims.get(&id).cloned())
    }

    async fn delete_claim(&self, id: i64, volunteer_id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.claims.get(&id) {
            Some(c) if c.volunteer_id == volunteer_id => Ok(t.remove_claim(id).is_some()),
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn fields(title: &str) -> GiftFields {
        GiftFields {
            title: title.into(),
            ..GiftFields::default()
        }
    }

    async fn seeded() -> (MemoryStore, User, User) {
        let store = MemoryStore::new();
        let alice = store.create_user("alice", "h").await.unwrap();
        let bob = store.create_user("bob", "h").await.unwrap();
        (store, alice, bob)
    }

    #[tokio::test]
    async fn duplicate_user_name_conflicts() {
        let (store, _, _) = seeded().await;
        let err = store.create_user("alice", "h").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn only_first_user_is_admin() {
        let (store, alice, bob) = seeded().await;
        assert_eq!(alice.role, Role::Admin);
        assert_eq!(bob.role, Role::User);

        assert!(store.delete_user(bob.id).await.unwrap());
        let carol = store.create_user("carol", "h").await.unwrap();
        assert_eq!(carol.role, Role::User);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_registrations_yield_one_admin() {
        let store = Arc::new(MemoryStore::new());
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.create_user(&format!("u{i}"), "h").await })
            })
            .collect();
        let users: Vec<User> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        let admins = users.iter().filter(|u| u.role == Role::Admin).count();
        assert_eq!(users.len(), 16);
        assert_eq!(admins, 1);
    }

    #[tokio::test]
    async fn rename_to_existing_name_conflicts_but_keeping_own_name_is_fine() {
        let (store, alice, bob) = seeded().await;
        assert!(matches!(
            store.update_user(bob.id, "alice", Role::User).await,
            Err(StoreError::Conflict(_))
        ));
        let updated = store
            .update_user(alice.id, "alice", Role::User)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.role, Role::User);
        assert!(store.update_user(999, "x", Role::User).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_sets_and_release_clears_taken_flag() {
        let (store, alice, bob) = seeded().await;
        let gift = store.create_gift(alice.id, &fields("Kettle")).await.unwrap();
        assert!(!gift.is_taken);

        let claim = store.create_claim(gift.id, bob.id).await.unwrap();
        assert!(store.get_gift(gift.id).await.unwrap().unwrap().is_taken);

        assert!(matches!(
            store.create_claim(gift.id, bob.id).await,
            Err(StoreError::Conflict(_))
        ));

        // Someone else's claim id is invisible to alice.
        assert!(!store.delete_claim(claim.id, alice.id).await.unwrap());
        assert!(store.delete_claim(claim.id, bob.id).await.unwrap());
        assert!(!store.get_gift(gift.id).await.unwrap().unwrap().is_taken);
        assert!(store.list_claims_for(bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn claim_on_missing_gift_is_not_found() {
        let (store, _, bob) = seeded().await;
        assert!(matches!(
            store.create_claim(42, bob.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_gift_never_touches_taken_flag() {
        let (store, alice, bob) = seeded().await;
        let gift = store.create_gift(alice.id, &fields("Kettle")).await.unwrap();
        store.create_claim(gift.id, bob.id).await.unwrap();

        let updated = store
            .update_gift(gift.id, &fields("Teapot"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Teapot");
        assert!(updated.is_taken);
    }

    #[tokio::test]
    async fn deleting_gift_drops_its_claim() {
        let (store, alice, bob) = seeded().await;
        let gift = store.create_gift(alice.id, &fields("Kettle")).await.unwrap();
        let claim = store.create_claim(gift.id, bob.id).await.unwrap();

        assert!(store.delete_gift(gift.id).await.unwrap());
        assert!(store.get_claim(claim.id).await.unwrap().is_none());
        assert!(!store.delete_gift(gift.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_user_cascades_and_frees_claimed_gifts() {
        let (store, alice, bob) = seeded().await;
        let alices = store.create_gift(alice.id, &fields("Kettle")).await.unwrap();
        let bobs = store.create_gift(bob.id, &fields("Scarf")).await.unwrap();
        store.create_claim(alices.id, bob.id).await.unwrap();
        let on_bobs = store.create_claim(bobs.id, alice.id).await.unwrap();

        assert!(store.delete_user(bob.id).await.unwrap());

        assert!(store.get_user(bob.id).await.unwrap().is_none());
        assert!(store.get_gift(bobs.id).await.unwrap().is_none());
        assert!(store.get_claim(on_bobs.id).await.unwrap().is_none());
        let kettle = store.get_gift(alices.id).await.unwrap().unwrap();
        assert!(!kettle.is_taken);
        assert!(store.list_claims_for(alice.id).await.unwrap().is_empty());
        assert!(!store.delete_user(bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn gift_for_missing_owner_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.create_gift(1, &fields("Kettle")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_have_exactly_one_winner() {
        let (store, alice, _) = seeded().await;
        let store = Arc::new(store);
        let gift = store.create_gift(alice.id, &fields("Kettle")).await.unwrap();

        let mut volunteers = Vec::new();
        for i in 0..16 {
            let u = store
                .create_user(&format!("v{i}"), "h")
                .await
                .unwrap();
            volunteers.push(u.id);
        }

        let tasks: Vec<_> = volunteers
            .into_iter()
            .map(|vid| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.create_claim(gift.id, vid).await })
            })
            .collect();
        let results = futures::future::join_all(tasks).await;

        let wins = results
            .iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(StoreError::Conflict(_)))))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 15);
        assert!(store.get_gift(gift.id).await.unwrap().unwrap().is_taken);
    }
}

//! PgStore against a real database. Runs only when `TEST_DATABASE_URL` points
//! at a disposable PostgreSQL database; the tables are reset first.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use wishlist_core::models::{GiftFields, Role};
use wishlist_core::store::{PgStore, StoreError, WishlistStore};

async fn store() -> Option<PgStore> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    wishlist_core::migrate::migrate(&pool).await.expect("migrate");
    sqlx::query("TRUNCATE volunteers, gifts, users RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .expect("truncate");
    Some(PgStore::new(pool))
}

fn fields(title: &str) -> GiftFields {
    GiftFields {
        title: title.into(),
        ..GiftFields::default()
    }
}

// One test so runs never truncate under each other.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn postgres_store_round_trip() {
    let Some(store) = store().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };

    let store = Arc::new(store);

    // Racing first registrations on the empty table: exactly one admin.
    let signups = (0..8).map(|i| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.create_user(&format!("r{i}"), "h").await })
    });
    let admins = futures::future::join_all(signups)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .filter(|u| u.role == Role::Admin)
        .count();
    assert_eq!(admins, 1);

    let alice = store.create_user("alice", "h").await.unwrap();
    let bob = store.create_user("bob", "h").await.unwrap();
    assert_eq!(bob.role, Role::User);
    assert!(matches!(
        store.create_user("alice", "h").await,
        Err(StoreError::Conflict(_))
    ));
    assert_eq!(store.list_users().await.unwrap().len(), 10);
    let found = store.find_user_by_name("bob").await.unwrap().unwrap();
    assert_eq!(found.user, bob);

    assert!(matches!(
        store.create_gift(9999, &fields("Orphan")).await,
        Err(StoreError::NotFound(_))
    ));
    let gift = store.create_gift(alice.id, &fields("Kettle")).await.unwrap();

    let claim = store.create_claim(gift.id, bob.id).await.unwrap();
    assert!(store.get_gift(gift.id).await.unwrap().unwrap().is_taken);
    assert!(matches!(
        store.create_claim(gift.id, bob.id).await,
        Err(StoreError::Conflict(_))
    ));
    assert!(!store.delete_claim(claim.id, alice.id).await.unwrap());
    assert!(store.delete_claim(claim.id, bob.id).await.unwrap());
    assert!(!store.get_gift(gift.id).await.unwrap().unwrap().is_taken);

    // Racing claims: exactly one commits.
    let mut volunteers = Vec::new();
    for i in 0..8 {
        volunteers.push(
            store
                .create_user(&format!("v{i}"), "h")
                .await
                .unwrap()
                .id,
        );
    }
    let attempts = volunteers.into_iter().map(|vid| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.create_claim(gift.id, vid).await })
    });
    let results = futures::future::join_all(attempts).await;
    let wins = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
    assert_eq!(wins, 1);

    // Deleting the winner frees the gift.
    let winner = results
        .into_iter()
        .find_map(|r| r.ok().and_then(Result::ok))
        .unwrap();
    assert!(store.delete_user(winner.volunteer_id).await.unwrap());
    assert!(!store.get_gift(gift.id).await.unwrap().unwrap().is_taken);
    assert!(store.get_claim(winner.id).await.unwrap().is_none());
}

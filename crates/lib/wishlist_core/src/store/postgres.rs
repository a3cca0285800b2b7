//! Postgres-backed store.
//!
//! Multi-step writes run in a transaction. The claim path locks the gift row
//! (`SELECT ... FOR UPDATE`) and `volunteers.gift_id` carries a unique index,
//! so two racing claims can never both commit.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::{StoreError, StoreResult, WishlistStore};
use crate::models::auth::{Role, User, UserWithPassword};
use crate::models::gift::{Claim, Gift, GiftFields};

type UserRow = (i64, String, String);
type GiftRow = (
    i64,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    bool,
    i64,
);
type ClaimRow = (i64, i64, i64);

const GIFT_COLUMNS: &str = "id, title, description, link, category, is_taken, user_id";

fn user_from_row((id, name, role): UserRow) -> StoreResult<User> {
    let role = role
        .parse::<Role>()
        .map_err(|e| StoreError::Corrupt(format!("user {id}: {e}")))?;
    Ok(User { id, name, role })
}

fn gift_from_row(
    (id, title, description, link, category, is_taken, owner_id): GiftRow,
) -> Gift {
    Gift {
        id,
        title,
        description,
        link,
        category,
        is_taken,
        owner_id,
    }
}

fn claim_from_row((id, gift_id, volunteer_id): ClaimRow) -> Claim {
    Claim {
        id,
        gift_id,
        volunteer_id,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// [`WishlistStore`] over a sqlx connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn release_claims(
        tx: &mut Transaction<'_, Postgres>,
        volunteer_id: i64,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE gifts SET is_taken = FALSE \
             WHERE id IN (SELECT gift_id FROM volunteers WHERE volunteer_user_id = $1)",
        )
        .bind(volunteer_id)
        .execute(&mut **tx)
        .await?;
        sqlx::query("DELETE FROM volunteers WHERE volunteer_user_id = $1")
            .bind(volunteer_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl WishlistStore for PgStore {
    async fn create_user(&self, name: &str, password_hash: &str) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        // Blocks concurrent inserts until commit so only one of them can see
        // an empty table. Plain reads are unaffected.
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (name, password_hash, role) \
             SELECT $1, $2, CASE WHEN EXISTS (SELECT 1 FROM users) THEN 'user' ELSE 'admin' END \
             RETURNING id, name, role",
        )
        .bind(name)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("user name {name} is taken"))
            } else {
                StoreError::Database(e)
            }
        })?;
        tx.commit().await?;
        user_from_row(row)
    }

    async fn find_user_by_name(&self, name: &str) -> StoreResult<Option<UserWithPassword>> {
        let row = sqlx::query_as::<_, (i64, String, String, String)>(
            "SELECT id, name, role, password_hash FROM users WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|(id, name, role, password_hash)| {
            Ok(UserWithPassword {
                user: user_from_row((id, name, role))?,
                password_hash,
            })
        })
        .transpose()
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, name, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(user_from_row).transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT id, name, role FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(user_from_row).collect()
    }

    async fn update_user(&self, id: i64, name: &str, role: Role) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET name = $2, role = $3 WHERE id = $1 RETURNING id, name, role",
        )
        .bind(id)
        .bind(name)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("user name {name} is taken"))
            } else {
                StoreError::Database(e)
            }
        })?;
        row.map(user_from_row).transpose()
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        Self::release_claims(&mut tx, id).await?;
        // Gifts and the claims on them follow through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_gifts(&self) -> StoreResult<Vec<Gift>> {
        let rows = sqlx::query_as::<_, GiftRow>(&format!(
            "SELECT {GIFT_COLUMNS} FROM gifts ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(gift_from_row).collect())
    }

    async fn list_gifts_for_owner(&self, owner_id: i64) -> StoreResult<Vec<Gift>> {
        let rows = sqlx::query_as::<_, GiftRow>(&format!(
            "SELECT {GIFT_COLUMNS} FROM gifts WHERE user_id = $1 ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(gift_from_row).collect())
    }

    async fn get_gift(&self, id: i64) -> StoreResult<Option<Gift>> {
        let row = sqlx::query_as::<_, GiftRow>(&format!(
            "SELECT {GIFT_COLUMNS} FROM gifts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(gift_from_row))
    }

    async fn create_gift(&self, owner_id: i64, fields: &GiftFields) -> StoreResult<Gift> {
        let row = sqlx::query_as::<_, GiftRow>(&format!(
            "INSERT INTO gifts (title, description, link, category, user_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {GIFT_COLUMNS}"
        ))
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.link)
        .bind(&fields.category)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::NotFound(format!("user {owner_id}"))
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(gift_from_row(row))
    }

    async fn update_gift(&self, id: i64, fields: &GiftFields) -> StoreResult<Option<Gift>> {
        let row = sqlx::query_as::<_, GiftRow>(&format!(
            "UPDATE gifts SET title = $2, description = $3, link = $4, category = $5 \
             WHERE id = $1 RETURNING {GIFT_COLUMNS}"
        ))
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.link)
        .bind(&fields.category)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(gift_from_row))
    }

    async fn delete_gift(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM gifts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_claim(&self, gift_id: i64, volunteer_id: i64) -> StoreResult<Claim> {
        let mut tx = self.pool.begin().await?;

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT is_taken FROM gifts WHERE id = $1 FOR UPDATE",
        )
        .bind(gift_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("gift {gift_id}")))?;
        if taken {
            return Err(StoreError::Conflict(format!("gift {gift_id} is already taken")));
        }

        let row = sqlx::query_as::<_, ClaimRow>(
            "INSERT INTO volunteers (gift_id, volunteer_user_id) VALUES ($1, $2) \
             RETURNING id, gift_id, volunteer_user_id",
        )
        .bind(gift_id)
        .bind(volunteer_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("gift {gift_id} is already taken"))
            } else if is_foreign_key_violation(&e) {
                StoreError::NotFound(format!("user {volunteer_id}"))
            } else {
                StoreError::Database(e)
            }
        })?;

        sqlx::query("UPDATE gifts SET is_taken = TRUE WHERE id = $1")
            .bind(gift_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(claim_from_row(row))
    }

    async fn list_claims_for(&self, volunteer_id: i64) -> StoreResult<Vec<Claim>> {
        let rows = sqlx::query_as::<_, ClaimRow>(
            "SELECT id, gift_id, volunteer_user_id FROM volunteers \
             WHERE volunteer_user_id = $1 ORDER BY id",
        )
        .bind(volunteer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(claim_from_row).collect())
    }

    async fn get_claim(&self, id: i64) -> StoreResult<Option<Claim>> {
        let row = sqlx::query_as::<_, ClaimRow>(
            "SELECT id, gift_id, volunteer_user_id FROM volunteers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(claim_from_row))
    }

    async fn delete_claim(&self, id: i64, volunteer_id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let gift_id = sqlx::query_scalar::<_, i64>(
            "DELETE FROM volunteers WHERE id = $1 AND volunteer_user_id = $2 RETURNING gift_id",
        )
        .bind(id)
        .bind(volunteer_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(gift_id) = gift_id else {
            return Ok(false);
        };
        sqlx::query("UPDATE gifts SET is_taken = FALSE WHERE id = $1")
            .bind(gift_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }
}

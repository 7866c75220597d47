//! Session ledger: one row per issued bearer token.
//!
//! Rows are audit/bookkeeping state. A token's validity is governed entirely
//! by its signature and expiry claim; deleting a row on logout does not
//! invalidate the signed token before its natural expiry.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: String,
    pub created_at: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// Client metadata captured with a session for audit purposes.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl Session {
    /// Record an issued token. Inserting a token that is already recorded is
    /// a no-op, which absorbs duplicate-session races on login retries.
    pub async fn record(
        pool: &SqlitePool,
        user_id: &str,
        token: &str,
        expires_at: &str,
        client: &ClientMeta,
    ) -> Result<(), sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, token, expires_at, created_at, user_agent, ip_address)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(token) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .bind(&now)
        .bind(&client.user_agent)
        .bind(&client.ip_address)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Delete the session row for a token. Revoking an unknown token is not
    /// an error.
    pub async fn revoke(pool: &SqlitePool, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Count sessions whose expiry is strictly after `now` (RFC 3339).
    pub async fn count_active(pool: &SqlitePool, now: &str) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE expires_at > ?")
            .bind(now)
            .fetch_one(pool)
            .await?;
        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn seed_user(pool: &SqlitePool, id: &str) {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, role, is_active, created_at, updated_at)
             VALUES (?, ?, 'Test', 'x', 'user', 1, ?, ?)",
        )
        .bind(id)
        .bind(format!("{}@test.com", id))
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_record_is_idempotent_per_token() {
        let pool = db::init_test().await;
        seed_user(&pool, "u1").await;

        let expires = (chrono::Utc::now() + chrono::Duration::days(7)).to_rfc3339();
        let meta = ClientMeta::default();
        Session::record(&pool, "u1", "tok-1", &expires, &meta)
            .await
            .unwrap();
        // Second insert with the same token must not fail or duplicate
        Session::record(&pool, "u1", "tok-1", &expires, &meta)
            .await
            .unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE token = 'tok-1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_revoke_unknown_token_is_noop() {
        let pool = db::init_test().await;
        Session::revoke(&pool, "does-not-exist").await.unwrap();
    }

    #[tokio::test]
    async fn test_count_active_excludes_expired() {
        let pool = db::init_test().await;
        seed_user(&pool, "u1").await;

        let now = chrono::Utc::now();
        let meta = ClientMeta::default();
        let live = (now + chrono::Duration::days(1)).to_rfc3339();
        let dead = (now - chrono::Duration::days(1)).to_rfc3339();
        Session::record(&pool, "u1", "tok-live", &live, &meta)
            .await
            .unwrap();
        Session::record(&pool, "u1", "tok-dead", &dead, &meta)
            .await
            .unwrap();

        let active = Session::count_active(&pool, &now.to_rfc3339()).await.unwrap();
        assert_eq!(active, 1);
    }

    #[tokio::test]
    async fn test_sessions_cascade_on_user_delete() {
        let pool = db::init_test().await;
        seed_user(&pool, "u1").await;

        let expires = (chrono::Utc::now() + chrono::Duration::days(7)).to_rfc3339();
        Session::record(&pool, "u1", "tok-1", &expires, &ClientMeta::default())
            .await
            .unwrap();

        sqlx::query("DELETE FROM users WHERE id = 'u1'")
            .execute(&pool)
            .await
            .unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }
}

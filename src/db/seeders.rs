//! Startup seeding for the bootstrap admin account.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::api::auth::hash_password;
use crate::config::AuthConfig;
use crate::db::{User, ROLE_ADMIN};

/// Ensure the configured bootstrap admin exists and has the admin role.
/// Runs on every startup; does nothing when no admin account is configured.
pub async fn ensure_admin_user(pool: &SqlitePool, auth: &AuthConfig) -> Result<()> {
    let (email, password) = match (&auth.admin_email, &auth.admin_password) {
        (Some(email), Some(password)) => (email.to_lowercase(), password),
        _ => return Ok(()),
    };

    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(pool)
        .await?;

    let now = chrono::Utc::now().to_rfc3339();

    match existing {
        Some(user) if user.is_admin() => Ok(()),
        Some(user) => {
            sqlx::query("UPDATE users SET role = ?, is_active = 1, updated_at = ? WHERE id = ?")
                .bind(ROLE_ADMIN)
                .bind(&now)
                .bind(&user.id)
                .execute(pool)
                .await?;
            info!(email = %email, "Promoted existing user to admin");
            Ok(())
        }
        None => {
            let id = Uuid::new_v4().to_string();
            let password_hash =
                hash_password(password).context("Failed to hash bootstrap admin password")?;
            let name = auth.admin_name.clone().unwrap_or_else(|| "Admin".to_string());
            sqlx::query(
                r#"
                INSERT INTO users (id, email, name, password_hash, role, is_active, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, 1, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(&email)
            .bind(&name)
            .bind(&password_hash)
            .bind(ROLE_ADMIN)
            .bind(&now)
            .bind(&now)
            .execute(pool)
            .await?;
            info!(email = %email, "Created bootstrap admin user");
            Ok(())
        }
    }
}

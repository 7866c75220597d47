//! Admin-only endpoints: user listing and service-wide statistics.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::db::{Session, UserWithStats};
use crate::AppState;

use super::error::ApiError;
use super::policy::AdminClaims;

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserWithStats>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub admins: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TodoStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
}

#[derive(Debug, Serialize)]
pub struct SessionStats {
    pub active: i64,
}

#[derive(Debug, Serialize)]
pub struct Stats {
    pub users: UserStats,
    pub todos: TodoStats,
    pub sessions: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: Stats,
}

/// List all users with their todo counts
///
/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminClaims(_claims): AdminClaims,
) -> Result<Json<UserListResponse>, ApiError> {
    let users: Vec<UserWithStats> = sqlx::query_as(
        r#"
        SELECT u.id, u.email, u.name, u.role, u.is_active, u.created_at, u.last_login,
               COUNT(t.id) AS total_todos,
               COALESCE(SUM(CASE WHEN t.completed THEN 1 ELSE 0 END), 0) AS completed_todos
        FROM users u
        LEFT JOIN todos t ON t.user_id = u.id
        GROUP BY u.id
        ORDER BY u.created_at DESC
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(UserListResponse { users }))
}

/// Service-wide statistics
///
/// GET /admin/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
    AdminClaims(_claims): AdminClaims,
) -> Result<Json<StatsResponse>, ApiError> {
    let users: UserStats = sqlx::query_as(
        r#"
        SELECT COUNT(*) AS total,
               COALESCE(SUM(CASE WHEN is_active THEN 1 ELSE 0 END), 0) AS active,
               COALESCE(SUM(CASE WHEN role = 'admin' THEN 1 ELSE 0 END), 0) AS admins
        FROM users
        "#,
    )
    .fetch_one(&state.db)
    .await?;

    let todos: TodoStats = sqlx::query_as(
        r#"
        SELECT COUNT(*) AS total,
               COALESCE(SUM(CASE WHEN completed THEN 1 ELSE 0 END), 0) AS completed,
               COALESCE(SUM(CASE WHEN NOT completed THEN 1 ELSE 0 END), 0) AS pending
        FROM todos
        "#,
    )
    .fetch_one(&state.db)
    .await?;

    let now = chrono::Utc::now().to_rfc3339();
    let active_sessions = Session::count_active(&state.db, &now).await?;

    Ok(Json(StatsResponse {
        stats: Stats {
            users,
            todos,
            sessions: SessionStats {
                active: active_sessions,
            },
        },
    }))
}

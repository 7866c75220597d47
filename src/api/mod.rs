mod admin;
pub mod auth;
pub mod error;
pub mod policy;
pub mod token;
mod todos;
mod validation;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;
use error::ApiError;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (register/login public, verify/logout check the bearer
    // token themselves)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify", get(auth::verify))
        .route("/logout", post(auth::logout));

    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .route("/todos", get(todos::list_todos).post(todos::create_todo))
        .route(
            "/todos/:id",
            axum::routing::put(todos::update_todo).delete(todos::delete_todo),
        )
        .route("/admin/users", get(admin::list_users))
        .route("/admin/stats", get(admin::stats))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    timestamp: String,
}

/// Liveness probe with a trivial database round-trip
async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    sqlx::query("SELECT 1").execute(&state.db).await?;

    Ok(Json(HealthResponse {
        status: "OK",
        database: "reachable",
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

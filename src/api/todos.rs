//! Per-user todo CRUD endpoints.
//!
//! Every lookup carries the owner predicate, so "not found" and "not yours"
//! are the same 404 and resource existence is never disclosed to non-owners.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{CreateTodoRequest, Todo, UpdateTodoRequest, DEFAULT_PRIORITY};
use crate::AppState;

use super::auth::MessageResponse;
use super::error::ApiError;
use super::token::Claims;
use super::validation::{validate_priority, validate_title};

#[derive(Debug, Serialize)]
pub struct TodoListResponse {
    pub todos: Vec<Todo>,
}

#[derive(Debug, Serialize)]
pub struct TodoResponse {
    pub todo: Todo,
}

async fn find_owned(
    state: &AppState,
    todo_id: &str,
    owner_id: &str,
) -> Result<Option<Todo>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM todos WHERE id = ? AND user_id = ?")
        .bind(todo_id)
        .bind(owner_id)
        .fetch_optional(&state.db)
        .await
}

/// List the caller's todos, newest first
///
/// GET /todos
pub async fn list_todos(
    State(state): State<Arc<AppState>>,
    claims: Claims,
) -> Result<Json<TodoListResponse>, ApiError> {
    let todos: Vec<Todo> =
        sqlx::query_as("SELECT * FROM todos WHERE user_id = ? ORDER BY created_at DESC")
            .bind(&claims.user_id)
            .fetch_all(&state.db)
            .await?;

    Ok(Json(TodoListResponse { todos }))
}

/// Create a todo for the caller
///
/// POST /todos
pub async fn create_todo(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Json(request): Json<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoResponse>), ApiError> {
    let title = request.title.as_deref().unwrap_or_default();
    validate_title(title).map_err(ApiError::bad_request)?;
    let title = title.trim().to_string();

    let priority = match request.priority {
        Some(p) => {
            validate_priority(&p).map_err(ApiError::bad_request)?;
            p
        }
        None => DEFAULT_PRIORITY.to_string(),
    };

    let description = request
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO todos (id, user_id, title, description, completed, priority, due_date, created_at, updated_at)
        VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&claims.user_id)
    .bind(&title)
    .bind(&description)
    .bind(&priority)
    .bind(&request.due_date)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let todo: Todo = sqlx::query_as("SELECT * FROM todos WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    tracing::info!(todo_id = %todo.id, user_id = %claims.user_id, "Created todo");

    Ok((StatusCode::CREATED, Json(TodoResponse { todo })))
}

/// Partially update one of the caller's todos
///
/// PUT /todos/:id
pub async fn update_todo(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(id): Path<String>,
    Json(request): Json<UpdateTodoRequest>,
) -> Result<Json<TodoResponse>, ApiError> {
    let mut todo = find_owned(&state, &id, &claims.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Todo not found"))?;

    if let Some(title) = request.title {
        validate_title(&title).map_err(ApiError::bad_request)?;
        todo.title = title.trim().to_string();
    }

    if let Some(description) = request.description {
        todo.description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
    }

    if let Some(priority) = request.priority {
        validate_priority(&priority).map_err(ApiError::bad_request)?;
        todo.priority = priority;
    }

    if let Some(due_date) = request.due_date {
        todo.due_date = due_date;
    }

    if let Some(completed) = request.completed {
        todo.completed = completed;
        // Invariant: completed_at is set iff completed is true
        todo.completed_at = if completed {
            Some(chrono::Utc::now().to_rfc3339())
        } else {
            None
        };
    }

    todo.updated_at = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE todos
        SET title = ?, description = ?, completed = ?, priority = ?,
            due_date = ?, completed_at = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&todo.title)
    .bind(&todo.description)
    .bind(todo.completed)
    .bind(&todo.priority)
    .bind(&todo.due_date)
    .bind(&todo.completed_at)
    .bind(&todo.updated_at)
    .bind(&todo.id)
    .bind(&claims.user_id)
    .execute(&state.db)
    .await?;

    Ok(Json(TodoResponse { todo }))
}

/// Delete one of the caller's todos
///
/// DELETE /todos/:id
pub async fn delete_todo(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
        .bind(&id)
        .bind(&claims.user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Todo not found"));
    }

    tracing::info!(todo_id = %id, user_id = %claims.user_id, "Deleted todo");

    Ok(Json(MessageResponse {
        message: "Todo deleted successfully".to_string(),
    }))
}

//! To-do item models.

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

pub const PRIORITIES: [&str; 3] = ["low", "medium", "high"];
pub const DEFAULT_PRIORITY: &str = "medium";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: String,
    #[serde(rename = "dueDate")]
    pub due_date: Option<String>,
    #[serde(rename = "completedAt")]
    pub completed_at: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "dueDate")]
    pub due_date: Option<String>,
}

/// Partial update. For `description` and `due_date` an absent field means
/// "leave unchanged" while an explicit `null` clears the value, so both are
/// double-wrapped options.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<String>,
    #[serde(rename = "dueDate", default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::error::ApiError;
use crate::models::{Role, User};

#[derive(Debug, sqlx::FromRow)]
pub struct CommentView {
    pub id: i64,
    pub content: String,
    pub is_internal: bool,
    pub ticket_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub author_username: String,
    pub author_role: Role,
}

impl CommentView {
    pub fn into_json(self) -> Value {
        json!({
            "id": self.id,
            "content": self.content,
            "is_internal": self.is_internal,
            "ticket_id": self.ticket_id,
            "user_id": self.user_id,
            "created_at": self.created_at,
            "author": {
                "id": self.user_id,
                "username": self.author_username,
                "role": self.author_role,
            },
        })
    }
}

const VIEW_SELECT: &str = "SELECT c.id, c.content, c.is_internal, c.ticket_id, c.user_id, c.created_at, \
     u.username AS author_username, u.role AS author_role \
     FROM comments c JOIN users u ON u.id = c.user_id";

/// Comments in creation order. Internal comments are removed entirely for
/// regular users, not just flagged.
pub async fn list_visible(pool: &SqlitePool, role: Role, ticket_id: i64) -> Result<Vec<Value>, ApiError> {
    let sql = if role.is_staff() {
        format!("{} WHERE c.ticket_id = ? ORDER BY c.created_at ASC, c.id ASC", VIEW_SELECT)
    } else {
        format!(
            "{} WHERE c.ticket_id = ? AND c.is_internal = 0 ORDER BY c.created_at ASC, c.id ASC",
            VIEW_SELECT
        )
    };

    let rows: Vec<CommentView> = sqlx::query_as(&sql).bind(ticket_id).fetch_all(pool).await?;
    Ok(rows.into_iter().map(CommentView::into_json).collect())
}

/// Inserts the comment and bumps the parent ticket's `updated_at` in one
/// transaction. `is_internal` is coerced to false for non-staff authors.
pub async fn create(
    pool: &SqlitePool,
    current: &User,
    ticket_id: i64,
    content: &str,
    is_internal: bool,
) -> Result<CommentView, ApiError> {
    if content.trim().is_empty() {
        return Err(ApiError::validation("Comment content is required"));
    }

    let is_internal = is_internal && current.role.is_staff();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO comments (content, is_internal, ticket_id, user_id, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(content)
    .bind(is_internal)
    .bind(ticket_id)
    .bind(current.id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE tickets SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(ticket_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let sql = format!("{} WHERE c.id = ?", VIEW_SELECT);
    let view: CommentView = sqlx::query_as(&sql)
        .bind(result.last_insert_rowid())
        .fetch_one(pool)
        .await?;
    Ok(view)
}

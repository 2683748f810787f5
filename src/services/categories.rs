use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::ApiError;
use crate::models::Category;

pub async fn list(pool: &SqlitePool, include_inactive: bool) -> Result<Vec<Category>, ApiError> {
    let categories = if include_inactive {
        sqlx::query_as("SELECT * FROM categories ORDER BY id")
            .fetch_all(pool)
            .await?
    } else {
        sqlx::query_as("SELECT * FROM categories WHERE is_active = 1 ORDER BY id")
            .fetch_all(pool)
            .await?
    };
    Ok(categories)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Category, ApiError> {
    let category: Option<Category> = sqlx::query_as("SELECT * FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    category.ok_or_else(|| ApiError::not_found("Category not found"))
}

pub async fn create(pool: &SqlitePool, name: &str, description: &str) -> Result<Category, ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("Category name is required"));
    }

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Err(ApiError::conflict("Category name already exists"));
    }

    let result = sqlx::query(
        "INSERT INTO categories (name, description, is_active, created_at) VALUES (?, ?, 1, ?)",
    )
    .bind(name)
    .bind(description)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    get(pool, result.last_insert_rowid()).await
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn update(pool: &SqlitePool, id: i64, fields: CategoryUpdate) -> Result<Category, ApiError> {
    let mut category = get(pool, id).await?;

    if let Some(name) = fields.name {
        category.name = name;
    }
    if let Some(description) = fields.description {
        category.description = description;
    }
    if let Some(is_active) = fields.is_active {
        category.is_active = is_active;
    }

    sqlx::query("UPDATE categories SET name = ?, description = ?, is_active = ? WHERE id = ?")
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.is_active)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(category)
}

/// Deletion is blocked while any ticket references the category; the number of
/// offending tickets is part of the error message.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), ApiError> {
    get(pool, id).await?;

    let ticket_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE category_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if ticket_count > 0 {
        return Err(ApiError::in_use(format!(
            "Cannot delete category with {} tickets",
            ticket_count
        )));
    }

    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

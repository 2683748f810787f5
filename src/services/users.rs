use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::auth::{self, password};
use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::models::{Role, User};

pub async fn register(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    plain_password: &str,
    role: Role,
) -> Result<i64, ApiError> {
    let by_email: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    if by_email > 0 {
        return Err(ApiError::conflict("Email already registered"));
    }

    let by_username: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;
    if by_username > 0 {
        return Err(ApiError::conflict("Username already taken"));
    }

    let result = sqlx::query(
        "INSERT INTO users (username, email, password_hash, role, is_active, created_at) \
         VALUES (?, ?, ?, ?, 1, ?)",
    )
    .bind(username)
    .bind(email)
    .bind(password::hash_password(plain_password)?)
    .bind(role)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Validates credentials and issues a session token. The error never reveals
/// whether the email or the password was wrong.
pub async fn authenticate(
    pool: &SqlitePool,
    security: &SecurityConfig,
    email: &str,
    plain_password: &str,
) -> Result<(String, User), ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    let user = match user {
        Some(u) if password::verify_password(plain_password, &u.password_hash)? => u,
        _ => return Err(ApiError::unauthorized("Invalid credentials")),
    };

    let token = auth::issue_token(user.id, security)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok((token, user))
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<User>, ApiError> {
    let users = sqlx::query_as("SELECT * FROM users ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(users)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<User, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    user.ok_or_else(|| ApiError::not_found("User not found"))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Admin-only partial update. Role is immutable except through this path.
pub async fn update(pool: &SqlitePool, id: i64, fields: UserUpdate) -> Result<User, ApiError> {
    let mut user = get(pool, id).await?;

    if let Some(username) = fields.username {
        user.username = username;
    }
    if let Some(email) = fields.email {
        user.email = email;
    }
    if let Some(role) = fields.role {
        user.role = role;
    }
    if let Some(is_active) = fields.is_active {
        user.is_active = is_active;
    }

    sqlx::query("UPDATE users SET username = ?, email = ?, role = ?, is_active = ? WHERE id = ?")
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.is_active)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(user)
}

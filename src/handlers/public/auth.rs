use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::models::Role;
use crate::services::users;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.as_deref().unwrap_or("").trim();
    let email = req.email.as_deref().unwrap_or("").trim();
    let password = req.password.as_deref().unwrap_or("");

    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::validation("Missing required fields"));
    }

    let role = match req.role.as_deref() {
        None | Some("") => Role::User,
        Some(s) => s.parse().map_err(|_| ApiError::validation("Invalid role"))?,
    };

    users::register(&state.pool, username, email, password, role).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully" })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.as_deref().unwrap_or("");
    let password = req.password.as_deref().unwrap_or("");

    if email.is_empty() || password.is_empty() {
        return Err(ApiError::validation("Missing email or password"));
    }

    let (token, user) = users::authenticate(&state.pool, &state.config.security, email, password).await?;

    Ok(Json(json!({ "token": token, "user": user })))
}

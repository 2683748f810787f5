use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;

use super::require_admin;
use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::services::users::{self, UserUpdate};
use crate::state::AppState;

/// GET /api/users
pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&current)?;
    let users = users::list(&state.pool).await?;
    Ok(Json(json!({ "users": users })))
}

/// GET /api/users/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&current)?;
    let user = users::get(&state.pool, id).await?;
    Ok(Json(json!({ "user": user })))
}

/// PUT /api/users/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(fields): Json<UserUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&current)?;
    let user = users::update(&state.pool, id, fields).await?;
    Ok(Json(json!({ "message": "User updated successfully", "user": user })))
}

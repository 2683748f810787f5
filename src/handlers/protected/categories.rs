use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use super::require_admin;
use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::services::categories::{self, CategoryUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /api/categories
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = categories::list(&state.pool, query.include_inactive).await?;
    Ok(Json(json!({ "categories": categories })))
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// POST /api/categories
pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Json(req): Json<CreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&current)?;
    let category =
        categories::create(&state.pool, req.name.as_deref().unwrap_or(""), &req.description).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Category created successfully", "category": category })),
    ))
}

/// PUT /api/categories/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(fields): Json<CategoryUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&current)?;
    let category = categories::update(&state.pool, id, fields).await?;
    Ok(Json(json!({ "message": "Category updated successfully", "category": category })))
}

/// DELETE /api/categories/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&current)?;
    categories::delete(&state.pool, id).await?;
    Ok(Json(json!({ "message": "Category deleted successfully" })))
}

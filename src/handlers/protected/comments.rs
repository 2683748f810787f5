use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::notify;
use crate::services::{comments, tickets};
use crate::state::AppState;

/// GET /api/tickets/:id/comments
pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(ticket_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    tickets::fetch_guarded(&state.pool, &current, ticket_id).await?;
    let thread = comments::list_visible(&state.pool, current.role, ticket_id).await?;
    Ok(Json(json!({ "comments": thread })))
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub content: Option<String>,
    #[serde(default)]
    pub is_internal: bool,
}

/// POST /api/tickets/:id/comments
pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(ticket_id): Path<i64>,
    Json(req): Json<CreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tickets::fetch_guarded(&state.pool, &current, ticket_id).await?;

    let content = req.content.as_deref().unwrap_or("");
    let comment = comments::create(&state.pool, &current, ticket_id, content, req.is_internal).await?;

    let view = tickets::get_view(&state.pool, ticket_id).await?;
    notify::comment_added(
        state.mailer.as_ref(),
        &view,
        current.id,
        &current.username,
        &comment.content,
        comment.is_internal,
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Comment added successfully", "comment": comment.into_json() })),
    ))
}

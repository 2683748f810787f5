use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::models::VoteType;
use crate::services::{tickets, votes};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub vote_type: Option<String>,
}

/// POST /api/tickets/:id/vote
pub async fn cast(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(ticket_id): Path<i64>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tickets::get_row(&state.pool, ticket_id).await?;

    let vote_type: VoteType = req
        .vote_type
        .as_deref()
        .unwrap_or("")
        .parse()
        .map_err(|_| ApiError::validation("Invalid vote type"))?;

    let (message, summary) = votes::cast(&state.pool, ticket_id, current.id, vote_type).await?;

    Ok(Json(json!({
        "message": message,
        "vote_score": summary.vote_score,
        "user_vote": summary.user_vote,
        "upvotes": summary.upvotes,
        "downvotes": summary.downvotes,
    })))
}

/// GET /api/tickets/:id/vote
pub async fn show(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(ticket_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    tickets::get_row(&state.pool, ticket_id).await?;
    let summary = votes::tally(&state.pool, ticket_id, current.id).await?;

    Ok(Json(json!({
        "vote_score": summary.vote_score,
        "user_vote": summary.user_vote,
        "upvotes": summary.upvotes,
        "downvotes": summary.downvotes,
    })))
}

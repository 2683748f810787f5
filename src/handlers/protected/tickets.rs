use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::notify;
use crate::services::{comments, tickets};
use crate::state::AppState;

/// GET /api/tickets
pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Query(query): Query<tickets::ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = tickets::list(&state.pool, &current, &query).await?;
    Ok(Json(json!({
        "tickets": page.tickets,
        "total": page.total,
        "pages": page.pages,
        "current_page": page.current_page,
        "per_page": page.per_page,
    })))
}

/// POST /api/tickets
pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Json(req): Json<tickets::NewTicket>,
) -> Result<impl IntoResponse, ApiError> {
    let view = tickets::create(&state.pool, &current, req).await?;

    notify::ticket_created(state.mailer.as_ref(), &view).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Ticket created successfully", "ticket": view.into_json() })),
    ))
}

/// GET /api/tickets/:id - detail view with the visible comment thread
pub async fn show(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    tickets::fetch_guarded(&state.pool, &current, id).await?;
    let view = tickets::get_view(&state.pool, id).await?;
    let thread = comments::list_visible(&state.pool, current.role, id).await?;

    let mut ticket = view.into_json();
    ticket["comments"] = json!(thread);
    Ok(Json(json!({ "ticket": ticket })))
}

/// PUT /api/tickets/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(fields): Json<tickets::TicketUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let (view, status_change) = tickets::update(&state.pool, &current, id, fields).await?;

    if let Some((old_status, new_status)) = status_change {
        notify::status_changed(state.mailer.as_ref(), &view, old_status, new_status).await;
    }

    Ok(Json(json!({ "message": "Ticket updated successfully", "ticket": view.into_json() })))
}

/// DELETE /api/tickets/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    tickets::delete(&state.pool, &state.config.uploads.dir, &current, id).await?;
    Ok(Json(json!({ "message": "Ticket deleted successfully" })))
}

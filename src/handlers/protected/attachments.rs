use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::services::{attachments, tickets};
use crate::state::AppState;

/// POST /api/tickets/:id/attachments - multipart upload, field name `file`
pub async fn upload(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(ticket_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    tickets::fetch_guarded(&state.pool, &current, ticket_id).await?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(str::to_string)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| ApiError::validation("No file selected"))?;
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
            upload = Some((filename, data.to_vec()));
        }
    }

    let (filename, data) = upload.ok_or_else(|| ApiError::validation("No file provided"))?;

    let attachment = attachments::save(
        &state.pool,
        &state.config.uploads.dir,
        ticket_id,
        current.id,
        &filename,
        &data,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "File uploaded successfully", "attachment": attachment })),
    ))
}

/// GET /api/tickets/:id/attachments
pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(ticket_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    tickets::fetch_guarded(&state.pool, &current, ticket_id).await?;
    let attachments = attachments::list(&state.pool, ticket_id).await?;
    Ok(Json(json!({ "attachments": attachments })))
}

/// GET /api/attachments/:id/download - streams the file under its original name
pub async fn download(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let attachment = attachments::get(&state.pool, id).await?;
    tickets::fetch_guarded(&state.pool, &current, attachment.ticket_id).await?;

    let bytes = attachments::read_file(&state.config.uploads.dir, &attachment).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&attachment.mime_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment.original_filename.replace('"', "")
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or(HeaderValue::from_static("attachment")),
    );

    Ok((headers, bytes))
}

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth;
use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

/// Authenticated user context, loaded fresh from the database on every request
/// so role changes and deactivation take effect immediately.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Bearer-token middleware for the protected API. Rejections carry distinct
/// messages for missing, expired and malformed tokens.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Token is missing!"))?;

    let claims = auth::decode_token(&token, &state.config.security)
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(claims.sub)
        .fetch_optional(&state.pool)
        .await?;

    let user = user.ok_or_else(|| ApiError::unauthorized("User not found!"))?;
    if !user.is_active {
        return Err(ApiError::unauthorized("User account is inactive"));
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Accepts both `Authorization: Bearer <token>` and a bare token.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

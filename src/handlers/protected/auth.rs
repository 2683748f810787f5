use axum::{response::IntoResponse, Extension, Json};
use serde_json::json;

use crate::middleware::auth::CurrentUser;

/// GET /api/auth/me
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> impl IntoResponse {
    Json(json!({ "user": user }))
}

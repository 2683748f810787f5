use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod services;
pub mod state;

use handlers::{protected, public};
use state::AppState;

pub fn app(state: AppState) -> Router {
    let protected_api = Router::new()
        .route("/api/auth/me", get(protected::auth::me))
        .route("/api/users", get(protected::users::list))
        .route(
            "/api/users/:id",
            get(protected::users::show).put(protected::users::update),
        )
        .route(
            "/api/categories",
            get(protected::categories::list).post(protected::categories::create),
        )
        .route(
            "/api/categories/:id",
            axum::routing::put(protected::categories::update).delete(protected::categories::remove),
        )
        .route(
            "/api/tickets",
            get(protected::tickets::list).post(protected::tickets::create),
        )
        .route(
            "/api/tickets/:id",
            get(protected::tickets::show)
                .put(protected::tickets::update)
                .delete(protected::tickets::remove),
        )
        .route(
            "/api/tickets/:id/comments",
            get(protected::comments::list).post(protected::comments::create),
        )
        .route(
            "/api/tickets/:id/attachments",
            get(protected::attachments::list).post(protected::attachments::upload),
        )
        .route("/api/attachments/:id/download", get(protected::attachments::download))
        .route(
            "/api/tickets/:id/vote",
            get(protected::votes::show).post(protected::votes::cast),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::auth::require_auth));

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/auth/register", post(public::auth::register))
        .route("/api/auth/login", post(public::auth::login))
        .merge(protected_api)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "QuickDesk API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Helpdesk ticketing backend built with Rust (Axum)",
        "endpoints": {
            "auth": "/api/auth/register, /api/auth/login (public), /api/auth/me",
            "categories": "/api/categories[/:id]",
            "tickets": "/api/tickets[/:id]",
            "comments": "/api/tickets/:id/comments",
            "attachments": "/api/tickets/:id/attachments, /api/attachments/:id/download",
            "votes": "/api/tickets/:id/vote",
            "users": "/api/users[/:id] (admin)",
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            Json(json!({ "status": "ok", "timestamp": now, "database": "ok" })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "database_error": e.to_string(),
            })),
        ),
    }
}

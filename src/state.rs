use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::notify::Mailer;

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
}

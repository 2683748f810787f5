use std::sync::Arc;

use quickdesk::{app, config::AppConfig, db, notify, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, MAIL_USERNAME, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    tracing::info!("starting QuickDesk API");

    let pool = db::connect(&config.database).await?;
    db::seed(&pool).await?;

    let mailer = notify::mailer_from_config(&config.mail)?;
    tokio::fs::create_dir_all(&config.uploads.dir).await?;

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let state = AppState {
        pool,
        config: Arc::new(config),
        mailer,
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("QuickDesk API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}

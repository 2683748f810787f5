use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::auth::password::hash_password;
use crate::config::DatabaseConfig;

pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Bootstrap data for a fresh database: the default categories and the default
/// admin account. No-ops when the tables already have rows.
pub async fn seed(pool: &SqlitePool) -> anyhow::Result<()> {
    let categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?;

    if categories == 0 {
        let defaults = [
            ("Technical Support", "Hardware and software issues"),
            ("Account Issues", "Login and account related problems"),
            ("Feature Request", "Suggestions for new features"),
            ("Bug Report", "Report software bugs"),
            ("General Inquiry", "General questions and information"),
        ];
        for (name, description) in defaults {
            sqlx::query("INSERT INTO categories (name, description, is_active, created_at) VALUES (?, ?, 1, ?)")
                .bind(name)
                .bind(description)
                .bind(Utc::now())
                .execute(pool)
                .await?;
        }
        tracing::info!("default categories created");
    }

    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind("admin@quickdesk.com")
        .fetch_one(pool)
        .await?;

    if admins == 0 {
        sqlx::query(
            "INSERT INTO users (username, email, password_hash, role, is_active, created_at) \
             VALUES (?, ?, ?, 'admin', 1, ?)",
        )
        .bind("admin")
        .bind("admin@quickdesk.com")
        .bind(hash_password("admin123")?)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        tracing::info!("default admin user created: admin@quickdesk.com");
    }

    Ok(())
}

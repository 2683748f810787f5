use std::env;
use std::path::PathBuf;

/// Explicitly constructed application configuration. Built once in `main` and
/// handed to the components through `AppState` rather than read ambiently.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub mail: MailConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
}

/// SMTP settings. An empty username means mail is not configured and
/// notifications are logged instead of sent.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::defaults().with_env_overrides()
    }

    fn defaults() -> Self {
        Self {
            server: ServerConfig { port: 5000 },
            database: DatabaseConfig {
                url: "sqlite:quickdesk.db".to_string(),
                max_connections: 5,
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                jwt_expiry_hours: 24,
            },
            mail: MailConfig {
                smtp_host: "localhost".to_string(),
                smtp_port: 587,
                username: String::new(),
                password: String::new(),
                from_address: "support@quickdesk.local".to_string(),
            },
            uploads: UploadConfig {
                dir: PathBuf::from("uploads"),
            },
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("QUICKDESK_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("QUICKDESK_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("QUICKDESK_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("MAIL_SERVER") {
            self.mail.smtp_host = v;
        }
        if let Ok(v) = env::var("MAIL_PORT") {
            self.mail.smtp_port = v.parse().unwrap_or(self.mail.smtp_port);
        }
        if let Ok(v) = env::var("MAIL_USERNAME") {
            self.mail.username = v;
        }
        if let Ok(v) = env::var("MAIL_PASSWORD") {
            self.mail.password = v;
        }
        if let Ok(v) = env::var("MAIL_FROM") {
            self.mail.from_address = v;
        }
        if let Ok(v) = env::var("UPLOAD_FOLDER") {
            self.uploads.dir = PathBuf::from(v);
        }
        self
    }
}

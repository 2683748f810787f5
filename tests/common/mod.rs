// Shared harness for the integration tests. Each test gets its own app over a
// private in-memory database, seeded the same way the server seeds on boot,
// with a recording mailer in place of SMTP.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use quickdesk::config::{
    AppConfig, DatabaseConfig, MailConfig, SecurityConfig, ServerConfig, UploadConfig,
};
use quickdesk::notify::Mailer;
use quickdesk::state::AppState;
use quickdesk::{app, db};

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Captures outbound mail so tests can assert on notifications.
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<SentMail>>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub outbox: Arc<Mutex<Vec<SentMail>>>,
    uploads: TempDir,
}

impl TestApp {
    pub fn uploads_dir(&self) -> &std::path::Path {
        self.uploads.path()
    }

    pub fn outbox_len(&self) -> usize {
        self.outbox.lock().unwrap().len()
    }

    pub fn last_mail(&self) -> SentMail {
        self.outbox.lock().unwrap().last().cloned().expect("no mail sent")
    }

    pub fn jwt_secret(&self) -> String {
        self.state.config.security.jwt_secret.clone()
    }
}

pub async fn spawn_app() -> TestApp {
    let uploads = TempDir::new().expect("create upload dir");

    // Named shared-cache memory database so every pooled connection sees the
    // same data, unique per test.
    let db_url = format!(
        "sqlite:file:testdb-{}?mode=memory&cache=shared",
        Uuid::new_v4().simple()
    );

    let config = AppConfig {
        server: ServerConfig { port: 0 },
        database: DatabaseConfig {
            url: db_url,
            max_connections: 1,
        },
        security: SecurityConfig {
            jwt_secret: "integration-test-secret".to_string(),
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
            dir: uploads.path().to_path_buf(),
        },
    };

    let pool = db::connect(&config.database).await.expect("connect database");
    db::seed(&pool).await.expect("seed database");

    let outbox = Arc::new(Mutex::new(Vec::new()));
    let state = AppState {
        pool,
        config: Arc::new(config),
        mailer: Arc::new(RecordingMailer { sent: outbox.clone() }),
    };

    TestApp {
        router: app(state.clone()),
        state,
        outbox,
        uploads,
    }
}

/// Lowest-level entry point, for tests that need response headers or raw bytes.
pub async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router.clone().oneshot(request).await.expect("send request")
}

pub async fn call(
    app: &TestApp,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = send(app, request).await;
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse json body")
    };
    (status, json)
}

pub async fn get(app: &TestApp, path: &str, token: Option<&str>) -> (StatusCode, Value) {
    call(app, Method::GET, path, token, None).await
}

pub async fn post(
    app: &TestApp,
    path: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    call(app, Method::POST, path, token, Some(body)).await
}

pub async fn put(
    app: &TestApp,
    path: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    call(app, Method::PUT, path, token, Some(body)).await
}

pub async fn delete(app: &TestApp, path: &str, token: Option<&str>) -> (StatusCode, Value) {
    call(app, Method::DELETE, path, token, None).await
}

/// Registers a user through the API and returns (token, user id).
pub async fn create_user(app: &TestApp, username: &str, role: &str) -> (String, i64) {
    let email = format!("{username}@example.com");
    let (status, body) = post(
        app,
        "/api/auth/register",
        None,
        json!({
            "username": username,
            "email": email,
            "password": "password123",
            "role": role,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    login(app, &email, "password123").await
}

pub async fn login(app: &TestApp, email: &str, password: &str) -> (String, i64) {
    let (status, body) = post(
        app,
        "/api/auth/login",
        None,
        json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    let token = body["token"].as_str().expect("token").to_string();
    let id = body["user"]["id"].as_i64().expect("user id");
    (token, id)
}

/// The seeded bootstrap admin account.
pub async fn admin_token(app: &TestApp) -> String {
    login(app, "admin@quickdesk.com", "admin123").await.0
}

/// Creates a ticket in the first seeded category and returns its id.
pub async fn create_ticket(app: &TestApp, token: &str, subject: &str) -> i64 {
    create_ticket_in(app, token, subject, 1, None).await
}

pub async fn create_ticket_in(
    app: &TestApp,
    token: &str,
    subject: &str,
    category_id: i64,
    priority: Option<&str>,
) -> i64 {
    let mut body = json!({
        "subject": subject,
        "description": format!("Description for {subject}"),
        "category_id": category_id,
    });
    if let Some(priority) = priority {
        body["priority"] = json!(priority);
    }
    let (status, body) = post(app, "/api/tickets", Some(token), body).await;
    assert_eq!(status, StatusCode::CREATED, "create ticket failed: {body}");
    body["ticket"]["id"].as_i64().expect("ticket id")
}

pub const MULTIPART_BOUNDARY: &str = "qd-test-boundary-0c4f1e";

/// Hand-built multipart body with a single `file` field.
pub fn multipart_file(filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    (
        format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        body,
    )
}

pub async fn upload_file(
    app: &TestApp,
    token: &str,
    ticket_id: i64,
    filename: &str,
    data: &[u8],
) -> (StatusCode, Value) {
    let (content_type, body) = multipart_file(filename, data);
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/tickets/{ticket_id}/attachments"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("build upload request");

    let response = send(app, request).await;
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse json body")
    };
    (status, json)
}

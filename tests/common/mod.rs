#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use vocab_backend_rust::auth::AuthConfig;
use vocab_backend_rust::config::Config;
use vocab_backend_rust::db::config::DbConfig;
use vocab_backend_rust::db::operations::user::insert_user;
use vocab_backend_rust::db::operations::words::WordEntry;
use vocab_backend_rust::db::Database;
use vocab_backend_rust::services::llm_provider::{LlmConfig, LlmProvider};
use vocab_backend_rust::services::vocabulary::save_word;
use vocab_backend_rust::services::word_graph::WordFacts;
use vocab_backend_rust::state::AppState;

/// Keeps the temp dir alive for as long as the database is used.
pub struct TestDb {
    _dir: TempDir,
    pub db: Database,
}

pub async fn create_test_db() -> TestDb {
    let dir = TempDir::new().expect("temp dir");
    let db = Database::open(DbConfig::for_path(dir.path().join("vocab-test.db")))
        .await
        .expect("open test database");
    TestDb { _dir: dir, db }
}

pub struct TestApp {
    pub store: TestDb,
    pub app: Router,
}

impl TestApp {
    pub fn db(&self) -> &Database {
        &self.store.db
    }
}

/// App with a fixed signing secret and no text generator.
pub async fn create_test_app() -> TestApp {
    let store = create_test_db().await;
    let state = AppState::new(
        store.db.clone(),
        LlmProvider::new(LlmConfig::disabled()),
        AuthConfig::new("test-secret", 60 * 60 * 1000),
        Config::default(),
    );
    let app = vocab_backend_rust::create_app(state);
    TestApp { store, app }
}

pub async fn create_user(db: &Database, username: &str) -> String {
    insert_user(db.pool(), username, "not-a-real-hash")
        .await
        .expect("insert user")
        .id
}

/// Saves a text-and-example word into the user's list and returns its id.
pub async fn add_word(db: &Database, user_id: &str, text: &str) -> i64 {
    let entry = WordEntry {
        definition: Some(format!("meaning of {text}")),
        example1: Some(format!("I wrote {text} in a sentence.")),
        ..WordEntry::text_only(text)
    };
    save_word(db, user_id, &entry, &WordFacts::default())
        .await
        .expect("save word")
        .word_id
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Registers and logs in, returning the bearer token.
pub async fn register_and_login(app: &Router, username: &str) -> String {
    let credentials = serde_json::json!({ "username": username, "password": "correct-horse" });
    let (status, _) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(credentials.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(app, Method::POST, "/api/auth/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().expect("token").to_string()
}

//! Integration tests for registration, login, and the profile endpoint.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tokio::net::TcpListener;

use nvault_core::config::{AuthConfig, LimitsConfig};

/// Start the server on a random port and return (base_url, data_dir).
async fn start_test_server() -> (String, PathBuf) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_path_buf();

    let db = nvaultd::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = nvaultd::keys::load_or_generate_jwt_secret(&data_dir, &AuthConfig::default())
        .expect("Failed to generate JWT secret");

    let master_key = nvault_crypto::MasterKey::generate();
    let op = nvault_store::build_operator(&data_dir.join("blobs")).expect("Failed to build operator");
    let store = Arc::new(nvault_store::BlobStore::new(op, master_key));

    let staging_dir = data_dir.join("staging");
    std::fs::create_dir_all(&staging_dir).expect("Failed to create staging dir");

    let state = nvaultd::state::AppState {
        db,
        store,
        jwt_secret,
        token_ttl_hours: 168,
        limits: LimitsConfig::default(),
        staging_dir,
        metrics: Arc::new(nvaultd::metrics::AppMetrics::new()),
    };

    let app = nvaultd::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
        let _keep = tmp_dir;
    });

    (format!("http://{}", addr), data_dir)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_register_returns_token_and_user() {
    let (base_url, _) = start_test_server().await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": "secret-password",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["name"], "Alice");
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(!body["user"]["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let (base_url, _) = start_test_server().await;

    let client = reqwest::Client::new();
    let payload = json!({
        "name": "Alice",
        "email": "alice@example.com",
        "password": "secret-password",
    });

    let first = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    let second = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 400);
    assert!(second.text().await.unwrap().contains("already registered"));
}

#[tokio::test]
async fn test_register_email_case_insensitive() {
    let (base_url, _) = start_test_server().await;

    let client = reqwest::Client::new();
    let first = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({
            "name": "Alice",
            "email": "Alice@Example.com",
            "password": "secret-password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    let second = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({
            "name": "Other",
            "email": "alice@example.COM",
            "password": "secret-password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 400);
}

#[tokio::test]
async fn test_register_validation() {
    let (base_url, _) = start_test_server().await;
    let client = reqwest::Client::new();

    // Short password
    let resp = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({ "name": "A", "email": "a@example.com", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Missing name
    let resp = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({ "name": "", "email": "a@example.com", "password": "long-enough" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Malformed email
    let resp = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({ "name": "A", "email": "not-an-email", "password": "long-enough" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_login_roundtrip() {
    let (base_url, _) = start_test_server().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": "secret-password",
        }))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({ "email": "alice@example.com", "password": "secret-password" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap();
    assert_eq!(body["user"]["name"], "Alice");

    // The token works against a protected endpoint
    let me = client
        .get(format!("{}/api/auth/me", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), 200);
    let me_body: serde_json::Value = me.json().await.unwrap();
    assert_eq!(me_body["email"], "alice@example.com");
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let (base_url, _) = start_test_server().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": "secret-password",
        }))
        .send()
        .await
        .unwrap();

    let wrong_password = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({ "email": "alice@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_password.status(), 401);
    let wrong_password_body = wrong_password.text().await.unwrap();

    let unknown_email = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({ "email": "nobody@example.com", "password": "secret-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_email.status(), 401);
    let unknown_email_body = unknown_email.text().await.unwrap();

    // Same status and same body, no account-existence oracle
    assert_eq!(wrong_password_body, unknown_email_body);
}

#[tokio::test]
async fn test_me_requires_token() {
    let (base_url, _) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/auth/me", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("{}/api/auth/me", base_url))
        .header("Authorization", "Bearer garbage.token.here")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

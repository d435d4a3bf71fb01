//! Integration tests for the operational endpoints: /healthz, /readyz, /metrics.

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
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

async fn register_user(base_url: &str, email: &str) -> String {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({
            "name": "Test User",
            "email": email,
            "password": "secret-password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_healthz() {
    let (base_url, _) = start_test_server().await;

    let resp = reqwest::get(format!("{}/healthz", base_url)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_readyz_with_reachable_storage() {
    let (base_url, _) = start_test_server().await;

    let resp = reqwest::get(format!("{}/readyz", base_url)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ready");
}

#[tokio::test]
async fn test_ops_endpoints_skip_auth() {
    let (base_url, _) = start_test_server().await;

    // No Authorization header on any of these
    for path in ["/healthz", "/readyz", "/metrics"] {
        let resp = reqwest::get(format!("{}{}", base_url, path)).await.unwrap();
        assert_ne!(resp.status(), 401, "{} must not require auth", path);
    }
}

#[tokio::test]
async fn test_metrics_counters() {
    let (base_url, _) = start_test_server().await;
    let token = register_user(&base_url, "alice@example.com").await;

    // One note with a 512-byte attachment, then a download
    let part = Part::bytes(vec![7u8; 512])
        .file_name("m.bin")
        .mime_str("application/octet-stream")
        .unwrap();
    let resp = reqwest::Client::new()
        .post(format!("{}/api/notes", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .multipart(Form::new().text("title", "metered").part("file", part))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let note: serde_json::Value = resp.json().await.unwrap();

    let resp = reqwest::Client::new()
        .get(format!(
            "{}/api/notes/{}/file",
            base_url,
            note["id"].as_str().unwrap()
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = reqwest::get(format!("{}/metrics", base_url)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let content_type = resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let body = resp.text().await.unwrap();
    assert!(body.contains("nvault_notes_created_total 1"), "{body}");
    assert!(body.contains("nvault_blobs_encrypted_total 1"), "{body}");
    assert!(body.contains("nvault_blobs_decrypted_total 1"), "{body}");
    assert!(body.contains("nvault_upload_bytes_total 512"), "{body}");
}

#[tokio::test]
async fn test_metrics_blob_delete_counter() {
    let (base_url, _) = start_test_server().await;
    let token = register_user(&base_url, "alice@example.com").await;

    let part = Part::bytes(b"bye".to_vec())
        .file_name("bye.txt")
        .mime_str("text/plain")
        .unwrap();
    let resp = reqwest::Client::new()
        .post(format!("{}/api/notes", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .multipart(Form::new().text("title", "doomed").part("file", part))
        .send()
        .await
        .unwrap();
    let note: serde_json::Value = resp.json().await.unwrap();

    let resp = reqwest::Client::new()
        .delete(format!(
            "{}/api/notes/{}/file",
            base_url,
            note["id"].as_str().unwrap()
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body = reqwest::get(format!("{}/metrics", base_url))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("nvault_blobs_deleted_total 1"), "{body}");
}

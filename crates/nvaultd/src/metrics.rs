//! Prometheus /metrics + health check HTTP endpoints
//!
//! Endpoints:
//!   GET /metrics  — Prometheus text format
//!   GET /healthz  — Liveness probe (always 200 if process is running)
//!   GET /readyz   — Readiness probe (200 if blob storage is reachable)

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus_client::{
    encoding::text::encode, metrics::counter::Counter, registry::Registry,
};

use crate::state::AppState;

/// Daemon-wide counters, registered once at startup.
pub struct AppMetrics {
    registry: Registry,
    pub notes_created: Counter,
    pub blobs_encrypted: Counter,
    pub blobs_decrypted: Counter,
    pub blobs_deleted: Counter,
    pub upload_bytes: Counter,
}

impl AppMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let notes_created = Counter::default();
        registry.register("nvault_notes_created", "Notes created", notes_created.clone());

        let blobs_encrypted = Counter::default();
        registry.register(
            "nvault_blobs_encrypted",
            "Attachment blobs sealed and written",
            blobs_encrypted.clone(),
        );

        let blobs_decrypted = Counter::default();
        registry.register(
            "nvault_blobs_decrypted",
            "Attachment blobs read and opened",
            blobs_decrypted.clone(),
        );

        let blobs_deleted = Counter::default();
        registry.register(
            "nvault_blobs_deleted",
            "Attachment blobs deleted",
            blobs_deleted.clone(),
        );

        let upload_bytes = Counter::default();
        registry.register(
            "nvault_upload_bytes",
            "Plaintext bytes accepted for encryption",
            upload_bytes.clone(),
        );

        Self {
            registry,
            notes_created,
            blobs_encrypted,
            blobs_decrypted,
            blobs_deleted,
            upload_bytes,
        }
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut body = String::new();
    match encode(&mut body, &state.metrics.registry) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            tracing::error!("metrics encode failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                e.to_string(),
            )
        }
    }
}

/// Liveness probe: returns 200 if the process is running.
pub async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe: returns 200 if blob storage is reachable, 503 otherwise.
pub async fn readyz_handler(State(state): State<AppState>) -> impl IntoResponse {
    match nvault_store::check_health(state.store.operator()).await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "blob storage unreachable"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_encode() {
        let metrics = AppMetrics::new();
        metrics.notes_created.inc();
        metrics.upload_bytes.inc_by(512);

        let mut body = String::new();
        encode(&mut body, &metrics.registry).unwrap();

        assert!(body.contains("nvault_notes_created_total 1"));
        assert!(body.contains("nvault_upload_bytes_total 512"));
    }
}

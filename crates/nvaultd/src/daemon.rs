//! Daemon lifecycle: startup, health checks, systemd notify, HTTP server

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use nvault_core::config::NvaultConfig;
use nvault_store::BlobStore;

use crate::state::AppState;

pub async fn run(config: NvaultConfig) -> Result<()> {
    info!("daemon starting");

    // Master key first: without it nothing else matters
    let master_key = crate::keys::load_master_key(&config.vault)?;

    // Data layout
    let data_dir = &config.storage.data_dir;
    let staging_dir = config.storage.staging_dir();
    std::fs::create_dir_all(&staging_dir)
        .with_context(|| format!("creating staging dir {}", staging_dir.display()))?;

    let db = crate::db::init_db(data_dir)?;
    let jwt_secret = crate::keys::load_or_generate_jwt_secret(data_dir, &config.auth)?;

    // Blob storage operator; an unhealthy backend is reported but not
    // fatal, /readyz stays 503 until it recovers
    let blob_root = config.storage.blob_root();
    let op = nvault_store::build_operator(&blob_root)?;
    match nvault_store::check_health(&op).await {
        Ok(()) => info!(root = %blob_root.display(), "blob storage: ready"),
        Err(e) => warn!(root = %blob_root.display(), "blob storage: {e}"),
    }
    let store = Arc::new(BlobStore::new(op, master_key));

    let metrics = Arc::new(crate::metrics::AppMetrics::new());

    let state = AppState {
        db,
        store,
        jwt_secret,
        token_ttl_hours: config.auth.token_ttl_hours,
        limits: config.limits.clone(),
        staging_dir,
        metrics,
    };

    let app = crate::routes::build_router(state);

    let bind_addr = config.server.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("binding {bind_addr}: {e}"))?;

    info!(addr = %bind_addr, "http: listening");

    // Send systemd ready notification
    notify_ready();

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("http server: {e}"))
}

fn notify_ready() {
    // Send sd_notify(READY=1) to systemd if running as a service
    // Uses $NOTIFY_SOCKET env var; no-op if not set
    if let Ok(socket) = std::env::var("NOTIFY_SOCKET") {
        use std::os::unix::net::UnixDatagram;
        if let Ok(sock) = UnixDatagram::unbound() {
            let _ = sock.send_to(b"READY=1\n", &socket);
            tracing::debug!(notify_socket = %socket, "sent systemd READY=1");
        }
    }
}

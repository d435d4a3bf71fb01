//! Shared application state passed to all handlers via the axum State extractor.

use std::path::PathBuf;
use std::sync::Arc;

use nvault_core::config::LimitsConfig;
use nvault_store::BlobStore;

use crate::db::DbPool;
use crate::metrics::AppMetrics;

#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// Encrypted blob store (operator + master key)
    pub store: Arc<BlobStore>,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Access token lifetime in hours
    pub token_ttl_hours: u64,
    /// Upload and note size limits
    pub limits: LimitsConfig,
    /// Directory for staged plaintext uploads awaiting encryption
    pub staging_dir: PathBuf,
    /// Prometheus metrics
    pub metrics: Arc<AppMetrics>,
}

//! Blob storage health check

use anyhow::Result;
use opendal::Operator;

/// Verify the blob root is reachable by listing it.
pub async fn check_health(op: &Operator) -> Result<()> {
    op.list("/")
        .await
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!("blob storage health check failed: {e}"))
}

/// Returns true if blob storage is reachable, false otherwise (non-panicking)
pub async fn is_healthy(op: &Operator) -> bool {
    check_health(op).await.is_ok()
}

//! Encrypted blob store: seal, open, delete
//!
//! Every attachment is sealed whole under the master key and written to the
//! OpenDAL backend at a freshly minted locator. The IV needed to open the
//! blob again is returned to the caller, who persists it in note metadata.

use std::path::Path;

use opendal::Operator;
use tracing::{debug, warn};
use uuid::Uuid;

use nvault_core::{NvaultError, NvaultResult};
use nvault_crypto::MasterKey;

/// Result of sealing a blob: where it landed and the IV needed to open it.
///
/// The locator is a backend-relative path (`xx/yy/<uuid>.enc`); the IV is
/// 32 lowercase hex chars. Both are storage-internal and must never appear
/// in API responses.
#[derive(Debug, Clone)]
pub struct SealedBlob {
    pub locator: String,
    pub iv: String,
}

impl SealedBlob {
    /// Object name component of the locator (`<uuid>.enc`).
    pub fn file_name(&self) -> &str {
        self.locator.rsplit('/').next().unwrap_or(&self.locator)
    }
}

/// Blob store over an OpenDAL operator, sealing everything it writes.
///
/// Construction takes the operator and master key explicitly; nothing in
/// here reads configuration or process environment.
pub struct BlobStore {
    op: Operator,
    key: MasterKey,
}

impl BlobStore {
    pub fn new(op: Operator, key: MasterKey) -> Self {
        Self { op, key }
    }

    /// The underlying operator (health checks, tests).
    pub fn operator(&self) -> &Operator {
        &self.op
    }

    /// Seal a plaintext buffer and write it under a fresh locator.
    pub async fn encrypt_bytes(&self, plaintext: &[u8]) -> NvaultResult<SealedBlob> {
        let (iv, sealed) = nvault_crypto::encrypt_blob(&self.key, plaintext)
            .map_err(|e| NvaultError::Encryption(e.to_string()))?;

        let locator = new_locator();
        self.op
            .write(&locator, sealed)
            .await
            .map_err(|e| NvaultError::Storage(format!("writing blob {locator}: {e}")))?;

        debug!(%locator, size = plaintext.len(), "blob sealed and written");
        Ok(SealedBlob { locator, iv })
    }

    /// Seal a staged plaintext file, then remove the staged source.
    ///
    /// The staged file is gone once this returns `Ok`. If removing it fails
    /// the freshly written blob is rolled back and the error surfaced, so a
    /// success always means exactly one copy exists: the sealed one.
    pub async fn encrypt_file(&self, staged: &Path) -> NvaultResult<SealedBlob> {
        let plaintext = tokio::fs::read(staged).await?;
        let blob = self.encrypt_bytes(&plaintext).await?;

        if let Err(e) = tokio::fs::remove_file(staged).await {
            // Staged plaintext is still on disk; drop the orphaned blob.
            if let Err(del) = self.op.delete(&blob.locator).await {
                warn!(locator = %blob.locator, error = %del, "rollback delete failed");
            }
            return Err(NvaultError::Storage(format!(
                "removing staged plaintext {}: {e}",
                staged.display()
            )));
        }

        Ok(blob)
    }

    /// Read a sealed blob and open it with the recorded IV.
    ///
    /// A missing blob is `BlobNotFound`; a wrong key, wrong IV, or tampered
    /// object is `Decryption`.
    pub async fn decrypt_blob(&self, locator: &str, iv_hex: &str) -> NvaultResult<Vec<u8>> {
        let sealed = match self.op.read(locator).await {
            Ok(buf) => buf.to_vec(),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => {
                return Err(NvaultError::BlobNotFound(locator.to_string()));
            }
            Err(e) => {
                return Err(NvaultError::Storage(format!("reading blob {locator}: {e}")));
            }
        };

        let plaintext = nvault_crypto::decrypt_blob(&self.key, iv_hex, &sealed)
            .map_err(|e| NvaultError::Decryption(e.to_string()))?;

        debug!(%locator, size = plaintext.len(), "blob opened");
        Ok(plaintext)
    }

    /// Delete a sealed blob. Deleting a missing blob succeeds.
    pub async fn delete_blob(&self, locator: &str) -> NvaultResult<()> {
        self.op
            .delete(locator)
            .await
            .map_err(|e| NvaultError::Storage(format!("deleting blob {locator}: {e}")))?;

        debug!(%locator, "blob deleted");
        Ok(())
    }
}

/// Mint a backend-relative locator with two-level fan-out, keeping any
/// single directory from accumulating every blob.
fn new_locator() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}/{}/{id}.enc", &id[..2], &id[2..4])
}

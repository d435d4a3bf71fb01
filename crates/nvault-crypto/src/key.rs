//! Master key: parsing, validation, and redaction

use rand::RngCore;
use zeroize::Zeroize;

use crate::KEY_SIZE;

/// The 256-bit symmetric master key protecting all attachment blobs.
///
/// Configured as a 64-character hex string and loaded exactly once at
/// startup. Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Parse a hex-encoded master key, requiring exactly 64 hex characters.
    ///
    /// Surrounding whitespace is tolerated (key files usually end in a
    /// newline); anything else is a hard error so a misconfigured daemon
    /// fails before it accepts uploads.
    pub fn from_hex(hex_str: &str) -> anyhow::Result<Self> {
        let hex_str = hex_str.trim();
        if hex_str.len() != KEY_SIZE * 2 {
            anyhow::bail!(
                "master key must be {} hex characters, got {}",
                KEY_SIZE * 2,
                hex_str.len()
            );
        }

        let decoded =
            hex::decode(hex_str).map_err(|e| anyhow::anyhow!("master key is not valid hex: {e}"))?;

        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&decoded);
        Ok(Self { bytes })
    }

    /// Generate a fresh random master key (for first-time setup).
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

//! Key material loading: the master key and the JWT signing secret.
//!
//! The master key is operator-supplied and startup is fatal without it.
//! The JWT secret is server-local and generated on first start.

use std::path::Path;

use anyhow::{Context, Result};
use rand::RngCore;
use tracing::{info, warn};

use nvault_core::config::{AuthConfig, VaultConfig};
use nvault_crypto::MasterKey;

/// Environment variable holding the hex-encoded master key. Takes
/// precedence over `vault.master_key_file`.
pub const MASTER_KEY_ENV: &str = "NVAULT_MASTER_KEY";

/// Load the 32-byte master key from the environment or the configured
/// key file. Any failure here is fatal: the daemon must not come up
/// without the key that seals every attachment.
///
/// Key material itself is never logged, only where it came from.
pub fn load_master_key(config: &VaultConfig) -> Result<MasterKey> {
    if let Ok(hex_key) = std::env::var(MASTER_KEY_ENV) {
        let key = MasterKey::from_hex(&hex_key)
            .with_context(|| format!("invalid {MASTER_KEY_ENV}"))?;
        info!(source = MASTER_KEY_ENV, "master key loaded");
        return Ok(key);
    }

    let Some(path) = &config.master_key_file else {
        anyhow::bail!(
            "no master key configured: set {MASTER_KEY_ENV} or vault.master_key_file"
        );
    };

    let hex_key = std::fs::read_to_string(path)
        .with_context(|| format!("reading master key file {}", path.display()))?;
    let key = MasterKey::from_hex(&hex_key)
        .with_context(|| format!("invalid master key in {}", path.display()))?;
    info!(source = %path.display(), "master key loaded");
    Ok(key)
}

/// Load or generate the JWT signing secret (256-bit random).
///
/// Stored as raw bytes, by default at `<data_dir>/jwt.key`. A file of the
/// wrong size is treated as corrupt and regenerated, which invalidates
/// outstanding tokens but keeps the server bootable.
pub fn load_or_generate_jwt_secret(data_dir: &Path, config: &AuthConfig) -> Result<Vec<u8>> {
    let key_path = config
        .jwt_secret_file
        .clone()
        .unwrap_or_else(|| data_dir.join("jwt.key"));

    if key_path.exists() {
        let key = std::fs::read(&key_path)
            .with_context(|| format!("reading JWT secret {}", key_path.display()))?;
        if key.len() == 32 {
            info!(path = %key_path.display(), "JWT signing secret loaded");
            return Ok(key);
        }
        warn!(
            path = %key_path.display(),
            size = key.len(),
            "JWT secret file has wrong size, regenerating"
        );
    }

    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    std::fs::write(&key_path, key)
        .with_context(|| format!("writing JWT secret {}", key_path.display()))?;
    info!(path = %key_path.display(), "JWT signing secret generated");
    Ok(key.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_master_key_from_file() {
        let tmp = TempDir::new().unwrap();
        let key_file = tmp.path().join("master.key");
        std::fs::write(&key_file, "ab".repeat(32)).unwrap();

        let config = VaultConfig {
            master_key_file: Some(key_file),
        };
        let key = load_master_key(&config).unwrap();
        assert_eq!(key.as_bytes(), &[0xabu8; 32]);
    }

    #[test]
    fn test_load_master_key_file_trailing_newline() {
        let tmp = TempDir::new().unwrap();
        let key_file = tmp.path().join("master.key");
        std::fs::write(&key_file, format!("{}\n", "cd".repeat(32))).unwrap();

        let config = VaultConfig {
            master_key_file: Some(key_file),
        };
        let key = load_master_key(&config).unwrap();
        assert_eq!(key.as_bytes(), &[0xcdu8; 32]);
    }

    #[test]
    fn test_missing_master_key_is_fatal() {
        let config = VaultConfig {
            master_key_file: None,
        };
        assert!(load_master_key(&config).is_err());
    }

    #[test]
    fn test_short_master_key_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let key_file = tmp.path().join("master.key");
        std::fs::write(&key_file, "abcd").unwrap();

        let config = VaultConfig {
            master_key_file: Some(key_file),
        };
        assert!(load_master_key(&config).is_err());
    }

    #[test]
    fn test_jwt_secret_generated_then_reloaded() {
        let tmp = TempDir::new().unwrap();
        let config = AuthConfig::default();

        let first = load_or_generate_jwt_secret(tmp.path(), &config).unwrap();
        let second = load_or_generate_jwt_secret(tmp.path(), &config).unwrap();

        assert_eq!(first.len(), 32);
        assert_eq!(first, second);
    }

    #[test]
    fn test_jwt_secret_wrong_size_regenerated() {
        let tmp = TempDir::new().unwrap();
        let config = AuthConfig::default();
        std::fs::write(tmp.path().join("jwt.key"), b"short").unwrap();

        let key = load_or_generate_jwt_secret(tmp.path(), &config).unwrap();
        assert_eq!(key.len(), 32);
    }
}

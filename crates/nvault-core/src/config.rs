use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level daemon configuration (loaded from nvault.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NvaultConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub vault: VaultConfig,
    pub auth: AuthConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listen address (default: 127.0.0.1:5000)
    pub bind_addr: String,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for the SQLite database, staging area, and blobs
    pub data_dir: PathBuf,
    /// Ciphertext blob root (default: <data_dir>/blobs)
    pub blob_root: Option<PathBuf>,
    /// Staging directory for uploaded plaintext before encryption
    /// (default: <data_dir>/staging)
    pub staging_dir: Option<PathBuf>,
}

/// Master key configuration.
///
/// The key is 32 bytes given as 64 hex characters. The NVAULT_MASTER_KEY
/// environment variable takes precedence over the key file. Startup fails
/// if neither yields a valid key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Path to a file holding the hex-encoded master key
    pub master_key_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Access token lifetime in hours (default: 168 = 7 days)
    pub token_ttl_hours: u64,
    /// JWT signing key file (default: <data_dir>/jwt.key, generated on
    /// first start if missing)
    pub jwt_secret_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum attachment size in bytes (default: 10 MiB)
    pub max_upload_bytes: usize,
    /// Maximum note title length in characters
    pub max_title_chars: usize,
    /// Maximum note content length in characters
    pub max_content_chars: usize,
}

impl StorageConfig {
    pub fn blob_root(&self) -> PathBuf {
        self.blob_root
            .clone()
            .unwrap_or_else(|| self.data_dir.join("blobs"))
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("staging"))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".into(),
            log_level: "info".into(),
            log_format: "text".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/nvault"),
            blob_root: None,
            staging_dir: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: 168,
            jwt_secret_file: None,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            max_title_chars: 200,
            max_content_chars: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[server]
bind_addr = "0.0.0.0:8080"
log_level = "debug"
log_format = "json"

[storage]
data_dir = "/srv/nvault"
blob_root = "/srv/nvault-blobs"

[vault]
master_key_file = "/etc/nvault/master.key"

[auth]
token_ttl_hours = 24

[limits]
max_upload_bytes = 5242880
max_title_chars = 100
"#;
        let config: NvaultConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.server.log_format, "json");
        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/nvault"));
        assert_eq!(
            config.storage.blob_root(),
            PathBuf::from("/srv/nvault-blobs")
        );
        assert_eq!(
            config.vault.master_key_file,
            Some(PathBuf::from("/etc/nvault/master.key"))
        );
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert_eq!(config.limits.max_upload_bytes, 5_242_880);
        assert_eq!(config.limits.max_title_chars, 100);
        // Unset fields keep their defaults
        assert_eq!(config.limits.max_content_chars, 10_000);
    }

    #[test]
    fn test_parse_defaults() {
        let config: NvaultConfig = toml::from_str("").unwrap();

        assert_eq!(config.server.bind_addr, "127.0.0.1:5000");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/nvault"));
        assert_eq!(
            config.storage.blob_root(),
            PathBuf::from("/var/lib/nvault/blobs")
        );
        assert_eq!(
            config.storage.staging_dir(),
            PathBuf::from("/var/lib/nvault/staging")
        );
        assert!(config.vault.master_key_file.is_none());
        assert_eq!(config.auth.token_ttl_hours, 168);
        assert_eq!(config.limits.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[storage]
data_dir = "/tmp/nvault-test"
"#;
        let config: NvaultConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/nvault-test"));
        // Derived from the override
        assert_eq!(
            config.storage.staging_dir(),
            PathBuf::from("/tmp/nvault-test/staging")
        );
        // Defaults
        assert_eq!(config.server.bind_addr, "127.0.0.1:5000");
        assert_eq!(config.limits.max_title_chars, 200);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = NvaultConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: NvaultConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.server.bind_addr, parsed.server.bind_addr);
        assert_eq!(config.storage.data_dir, parsed.storage.data_dir);
        assert_eq!(config.limits.max_upload_bytes, parsed.limits.max_upload_bytes);
    }
}

//! nvaultd: NoteVault server daemon
//!
//! Usage:
//!   nvaultd [--config /etc/nvault/config.toml]
//!   nvaultd --generate-key     # print a fresh master key and exit

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use nvaultd::daemon;

#[derive(Parser, Debug)]
#[command(name = "nvaultd", version, about = "NoteVault server daemon")]
struct Cli {
    /// Path to nvault.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "NVAULT_CONFIG",
        default_value = "/etc/nvault/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "NVAULT_LOG", default_value = "info")]
    log: String,

    /// Log format (json, text)
    #[arg(long, env = "NVAULT_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Print a freshly generated master key (64 hex chars) and exit
    #[arg(long)]
    generate_key: bool,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_key {
        // Key goes to stdout for shell capture, never through the logger
        let key = nvault_crypto::MasterKey::generate();
        println!("{}", hex::encode(key.as_bytes()));
        return Ok(());
    }

    init_logging(&cli.log, &cli.log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "nvaultd starting"
    );

    let config = load_config(&cli.config).await?;

    daemon::run(config).await
}

async fn load_config(path: &PathBuf) -> Result<nvault_core::config::NvaultConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))
    } else {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            path.display()
        );
        Ok(nvault_core::config::NvaultConfig::default())
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }
}

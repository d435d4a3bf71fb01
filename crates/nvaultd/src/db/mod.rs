pub mod migrations;

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Type alias for the shared database connection.
/// rusqlite is synchronous — we wrap in Arc<Mutex> for thread safety
/// with tokio::task::spawn_blocking for DB operations.
pub type DbPool = Arc<Mutex<Connection>>;

/// Initialize the SQLite database: create the data directory if needed,
/// open (or create) the database file, enable WAL mode, and run migrations.
pub fn init_db(data_dir: &Path) -> Result<DbPool> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let db_path = data_dir.join("nvault.db");
    let mut conn = Connection::open(&db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;

    // WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("enabling WAL mode")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enabling foreign key enforcement")?;

    migrations::migrations()
        .to_latest(&mut conn)
        .context("running migrations")?;

    tracing::info!(path = %db_path.display(), "database initialized");

    Ok(Arc::new(Mutex::new(conn)))
}

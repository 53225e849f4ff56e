use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use shopmigrate_common::{Error, Result};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub busy_timeout: Duration,
    pub foreign_keys: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5000),
            foreign_keys: true,
        }
    }
}

/// Open (creating if needed) the database file to migrate.
pub fn open_database(db_path: &Path, options: &ConnectionOptions) -> Result<Connection> {
    info!("opening database at {}", db_path.display());
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")
        .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;
    configure(&conn, options)?;
    Ok(conn)
}

pub fn open_in_memory(options: &ConnectionOptions) -> Result<Connection> {
    let conn = Connection::open_in_memory()
        .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;
    configure(&conn, options)?;
    Ok(conn)
}

fn configure(conn: &Connection, options: &ConnectionOptions) -> Result<()> {
    conn.busy_timeout(options.busy_timeout)
        .map_err(|e| Error::Database(format!("failed to set busy timeout: {e}")))?;
    let fk = if options.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys={fk};"))
        .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;
    Ok(())
}

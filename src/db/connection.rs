use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use rusqlite::Connection;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".recipe-book";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "recipes.sqlite";
/// How long a connection waits on a locked database before giving up. Store
/// workers share one file, so a short wait beats an immediate busy error.
const BUSY_WAIT: Duration = Duration::from_secs(5);

/// Open the store at `path`, creating the file, its parent directory, and the
/// schema when missing, and return a live connection. The journal is switched
/// to WAL so every worker in the pool can hold its own connection to the same
/// file.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(path).context("failed to open SQLite database")?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("failed to enable WAL journaling")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("failed to relax synchronous mode")?;
    conn.busy_timeout(BUSY_WAIT)
        .context("failed to set busy timeout")?;

    initialize(&conn)?;
    Ok(conn)
}

/// Open a throwaway in-memory store with the schema applied. Primarily for
/// tests that exercise queries without touching the filesystem.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    initialize(&conn)?;
    Ok(conn)
}

/// Create the schema. `IF NOT EXISTS` keeps the call idempotent; there is no
/// migration versioning because the table shape never changed.
fn initialize(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            ingredient TEXT NOT NULL,
            image BLOB NOT NULL
        )",
        [],
    )
    .context("failed to create recipes table")?;

    Ok(())
}

/// Resolve the application data directory inside the user's home. The log
/// file lives here too, so the helper is exposed to the rest of the crate.
pub fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

/// Resolve the absolute path to the SQLite store inside the data directory.
pub fn store_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(DB_FILE_NAME))
}

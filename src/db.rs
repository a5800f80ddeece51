//! SQLite connections for index files.
//!
//! An index directory holds a single database file. Builds open it
//! read-write (creating it), queries open it read-only so a reader can never
//! modify a published index.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// File name of the database inside an index directory.
pub const INDEX_FILE: &str = "index.sqlite";

/// Open (creating if needed) the database inside `dir` for writing.
pub async fn connect_rw(dir: &Path) -> Result<SqlitePool> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create index directory: {}", dir.display()))?;

    // Rollback journal: the file must be self-contained before the
    // directory is renamed into place.
    let options = SqliteConnectOptions::new()
        .filename(dir.join(INDEX_FILE))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open index database in {}", dir.display()))?;

    Ok(pool)
}

/// Open an existing index database read-only.
pub async fn connect_ro(dir: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(dir.join(INDEX_FILE))
        .read_only(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open index database in {}", dir.display()))?;

    Ok(pool)
}

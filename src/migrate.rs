use anyhow::Result;
use sqlx::SqlitePool;

/// Create the index schema in a fresh staging database.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Chunks in insertion (rank tie-break) order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            seq INTEGER PRIMARY KEY,
            id TEXT NOT NULL UNIQUE,
            document_path TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            embedding BLOB NOT NULL,
            UNIQUE(document_path, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Single-row manifest
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS manifest (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            documents INTEGER NOT NULL,
            chunks INTEGER NOT NULL,
            built_at INTEGER NOT NULL,
            source_directory TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

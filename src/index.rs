//! On-disk vector index.
//!
//! An index is a directory holding one SQLite database ([`db::INDEX_FILE`])
//! with every chunk, its embedding BLOB and a single-row manifest.
//!
//! # Publishing
//!
//! Builds never write into the live location. They fill a sibling staging
//! directory (`<location>.staging-<uuid>`) and [`publish`] swaps it in:
//!
//! 1. move the live directory aside to `<location>.old-<uuid>`
//! 2. rename staging to `<location>`
//! 3. on failure of step 2, move the old directory back
//! 4. delete the old directory
//!
//! So on disk the location is either absent or a complete index.
//!
//! # Search
//!
//! Nearest-neighbour search is brute force: every vector is scored with
//! cosine similarity in Rust and the top `k` are kept. Equal scores keep
//! insertion order. This is plenty for a personal recipe collection.

use anyhow::{bail, Context, Result};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::db;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::migrate;
use crate::models::{Chunk, IndexManifest, SearchHit};

/// True when `location` holds a published index database.
pub fn index_exists(location: &Path) -> bool {
    location.join(db::INDEX_FILE).is_file()
}

/// A fresh sibling path for a build to write into.
pub fn staging_path(location: &Path) -> Result<PathBuf> {
    sibling(location, "staging")
}

fn sibling(location: &Path, tag: &str) -> Result<PathBuf> {
    let name = location
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Index location has no directory name: {}", location.display()))?;
    Ok(location.with_file_name(format!(
        "{}.{}-{}",
        name.to_string_lossy(),
        tag,
        Uuid::new_v4().simple()
    )))
}

/// Write a complete index into `dir`, which must not hold one yet.
///
/// `vectors[i]` is the embedding of `chunks[i]`. Everything is written in one
/// transaction and the pool is closed before returning, so the directory is
/// ready to be renamed.
pub async fn write_index(
    dir: &Path,
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
    manifest: &IndexManifest,
) -> Result<()> {
    if chunks.len() != vectors.len() {
        bail!(
            "Chunk/vector count mismatch: {} chunks, {} vectors",
            chunks.len(),
            vectors.len()
        );
    }

    let pool = db::connect_rw(dir).await?;
    let result = fill(&pool, chunks, vectors, manifest).await;
    pool.close().await;
    result
}

async fn fill(
    pool: &SqlitePool,
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
    manifest: &IndexManifest,
) -> Result<()> {
    migrate::create_schema(pool).await?;

    let mut tx = pool.begin().await?;

    for (chunk, vector) in chunks.iter().zip(vectors) {
        sqlx::query(
            "INSERT INTO chunks (id, document_path, chunk_index, text, hash, embedding) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&chunk.id)
        .bind(&chunk.document_path)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .bind(vec_to_blob(vector))
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to store chunk {} of {}", chunk.chunk_index, chunk.document_path))?;
    }

    sqlx::query(
        r#"
        INSERT INTO manifest (id, model, dims, documents, chunks, built_at, source_directory)
        VALUES (1, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&manifest.model)
    .bind(manifest.dims as i64)
    .bind(manifest.documents)
    .bind(manifest.chunks)
    .bind(manifest.built_at)
    .bind(&manifest.source_directory)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Atomically replace `location` with the finished `staging` directory.
pub fn publish(staging: &Path, location: &Path) -> Result<()> {
    let previous = if location.exists() {
        let old = sibling(location, "old")?;
        std::fs::rename(location, &old).with_context(|| {
            format!("Failed to move previous index aside: {}", location.display())
        })?;
        Some(old)
    } else {
        None
    };

    if let Err(e) = std::fs::rename(staging, location) {
        if let Some(old) = &previous {
            if let Err(restore) = std::fs::rename(old, location) {
                tracing::error!(
                    error = %restore,
                    old = %old.display(),
                    "failed to restore previous index"
                );
            }
        }
        return Err(e).with_context(|| format!("Failed to publish index at {}", location.display()));
    }

    if let Some(old) = previous {
        let removed = if old.is_dir() {
            std::fs::remove_dir_all(&old)
        } else {
            std::fs::remove_file(&old)
        };
        if let Err(e) = removed {
            tracing::warn!(error = %e, old = %old.display(), "failed to remove previous index");
        }
    }

    Ok(())
}

/// Best-effort removal of an abandoned staging directory.
pub fn discard(staging: &Path) {
    if staging.exists() {
        if let Err(e) = std::fs::remove_dir_all(staging) {
            tracing::warn!(error = %e, staging = %staging.display(), "failed to remove staging index");
        }
    }
}

/// Read the manifest of the published index at `location`.
pub async fn read_manifest(location: &Path) -> Result<IndexManifest> {
    let pool = db::connect_ro(location).await?;
    let result = fetch_manifest(&pool).await;
    pool.close().await;
    result
}

async fn fetch_manifest(pool: &SqlitePool) -> Result<IndexManifest> {
    let row = sqlx::query(
        "SELECT model, dims, documents, chunks, built_at, source_directory FROM manifest WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| anyhow::anyhow!("Index manifest is missing"))?;

    Ok(IndexManifest {
        model: row.get("model"),
        dims: row.get::<i64, _>("dims") as usize,
        documents: row.get("documents"),
        chunks: row.get("chunks"),
        built_at: row.get("built_at"),
        source_directory: row.get("source_directory"),
    })
}

/// Return the `k` chunks nearest to `query_vec`, best first.
///
/// Fails if the index was built by a different embedding model or with a
/// different dimensionality than the caller's.
pub async fn nearest(
    location: &Path,
    model: &str,
    query_vec: &[f32],
    k: usize,
) -> Result<Vec<SearchHit>> {
    let pool = db::connect_ro(location).await?;
    let result = scan(&pool, model, query_vec, k).await;
    pool.close().await;
    result
}

async fn scan(pool: &SqlitePool, model: &str, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
    let manifest = fetch_manifest(pool).await?;
    if manifest.model != model || manifest.dims != query_vec.len() {
        bail!(
            "Index was built with model '{}' ({} dims) but queries use '{}' ({} dims); rebuild the index",
            manifest.model,
            manifest.dims,
            model,
            query_vec.len()
        );
    }

    let rows = sqlx::query(
        "SELECT document_path, chunk_index, text, embedding FROM chunks ORDER BY seq",
    )
    .fetch_all(pool)
    .await?;

    let mut hits: Vec<SearchHit> = rows
        .iter()
        .map(|row| {
            let blob: Vec<u8> = row.get("embedding");
            let vec = blob_to_vec(&blob);
            SearchHit {
                text: row.get("text"),
                document_path: row.get("document_path"),
                chunk_index: row.get("chunk_index"),
                score: cosine_similarity(query_vec, &vec),
            }
        })
        .collect();

    // Stable sort: ties stay in insertion order.
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(k);

    Ok(hits)
}

//! Core data models used throughout the recipe agent.
//!
//! These types represent the recipe documents, chunks, and search hits that
//! flow through the indexing and retrieval pipeline.

use serde::Serialize;
use std::path::PathBuf;

/// A recipe file read from the corpus directory.
#[derive(Debug, Clone)]
pub struct Document {
    /// Absolute or config-relative path to the source file.
    pub path: PathBuf,
    /// Path relative to the corpus root, used as the stable document key.
    pub relative_path: String,
    pub text: String,
}

/// A bounded slice of a document's text; the unit of embedding and retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    /// Relative path of the source document. Kept for traceability only.
    pub document_path: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// A chunk returned from a search, in similarity rank order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub document_path: String,
    pub chunk_index: i64,
    /// Cosine similarity between the query and the chunk embedding.
    pub score: f32,
}

/// Counts reported by a successful index build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub documents: usize,
    pub chunks: usize,
}

/// Result of a build that did not fail.
///
/// An empty corpus is a status rather than an error: nothing is written
/// and any existing index is left in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Built(BuildStats),
    EmptyCorpus,
}

/// Metadata stored alongside the vectors in a built index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexManifest {
    pub model: String,
    pub dims: usize,
    pub documents: i64,
    pub chunks: i64,
    /// Unix timestamp (seconds) of the build.
    pub built_at: i64,
    pub source_directory: String,
}

//! Recipe corpus discovery.
//!
//! Walks the configured source directory recursively and reads every file
//! whose path (relative to the root) matches `**/*.txt`. Results are sorted
//! by relative path so that chunk order, and therefore index content, is the
//! same on every build.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::models::Document;

const INCLUDE_GLOBS: &[&str] = &["**/*.txt"];
const EXCLUDE_GLOBS: &[&str] = &["**/.git/**"];

/// Read every recipe file under `root`.
///
/// The caller checks that `root` is a directory. Any walk or read failure
/// (permissions, invalid UTF-8) is returned as an error; no file is skipped
/// silently.
pub fn scan_corpus(root: &Path) -> Result<Vec<Document>> {
    let include_set = build_globset(INCLUDE_GLOBS)?;
    let exclude_set = build_globset(EXCLUDE_GLOBS)?;

    let mut documents = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recipe file: {}", path.display()))?;

        documents.push(Document {
            path: path.to_path_buf(),
            relative_path: rel_str,
            text,
        });
    }

    documents.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    Ok(documents)
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

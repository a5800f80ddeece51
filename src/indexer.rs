//! Index build pipeline.
//!
//! corpus scan → chunking → batched embedding → staging index → publish.
//!
//! Every build is a full rebuild. The live index is only touched by the
//! final [`index::publish`] step, so a failure anywhere earlier leaves the
//! previous index exactly as it was.

use anyhow::Context;
use std::path::Path;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::corpus;
use crate::embedding::{self, SharedProvider};
use crate::error::IndexError;
use crate::index;
use crate::models::{BuildOutcome, BuildStats, Chunk, IndexManifest};

/// Build the index at `config.index.location` from
/// `config.corpus.source_directory`.
///
/// - [`IndexError::SourceNotFound`] when the source is missing, not a
///   directory, or cannot be listed.
/// - `Ok(BuildOutcome::EmptyCorpus)` when there are no `.txt` files or they
///   hold only whitespace. Nothing is written.
/// - [`IndexError::BuildFailed`] for read, embedding or storage failures.
pub async fn build_index(
    config: &Config,
    provider: &SharedProvider,
) -> Result<BuildOutcome, IndexError> {
    let source = &config.corpus.source_directory;
    if !source.is_dir() {
        return Err(IndexError::SourceNotFound {
            path: source.clone(),
        });
    }
    if let Err(e) = std::fs::read_dir(source) {
        tracing::warn!(error = %e, source = %source.display(), "recipe directory not readable");
        return Err(IndexError::SourceNotFound {
            path: source.clone(),
        });
    }

    let documents = corpus::scan_corpus(source).map_err(IndexError::BuildFailed)?;

    let chunks: Vec<Chunk> = documents
        .iter()
        .flat_map(|doc| chunk_text(&doc.relative_path, &doc.text, config.chunking.max_chars))
        .collect();

    if chunks.is_empty() {
        tracing::warn!(
            source = %source.display(),
            files = documents.len(),
            "no recipe text found; index not built"
        );
        return Ok(BuildOutcome::EmptyCorpus);
    }

    let documents_with_chunks = {
        let mut paths: Vec<&str> = chunks.iter().map(|c| c.document_path.as_str()).collect();
        paths.dedup();
        paths.len()
    };

    tracing::info!(
        documents = documents_with_chunks,
        chunks = chunks.len(),
        model = provider.model_name(),
        "building recipe index"
    );

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedding::embed_batched(provider, &texts, config.embedding.batch_size)
        .await
        .context("Failed to embed recipe chunks")
        .map_err(IndexError::BuildFailed)?;

    let manifest = IndexManifest {
        model: provider.model_name().to_string(),
        dims: provider.dims(),
        documents: documents_with_chunks as i64,
        chunks: chunks.len() as i64,
        built_at: chrono::Utc::now().timestamp(),
        source_directory: source.display().to_string(),
    };

    write_and_publish(&config.index.location, &chunks, &vectors, &manifest)
        .await
        .map_err(IndexError::BuildFailed)?;

    tracing::info!(
        location = %config.index.location.display(),
        chunks = chunks.len(),
        "recipe index published"
    );

    Ok(BuildOutcome::Built(BuildStats {
        documents: documents_with_chunks,
        chunks: chunks.len(),
    }))
}

async fn write_and_publish(
    location: &Path,
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
    manifest: &IndexManifest,
) -> anyhow::Result<()> {
    let staging = index::staging_path(location)?;

    let result = match index::write_index(&staging, chunks, vectors, manifest).await {
        Ok(()) => index::publish(&staging, location),
        Err(e) => Err(e.context("Failed to write staging index")),
    };

    if result.is_err() {
        index::discard(&staging);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::embedding::create_provider;
    use tempfile::TempDir;

    fn setup(tmp: &TempDir) -> (Config, SharedProvider) {
        let mut config = Config::with_paths(tmp.path().join("recipes"), tmp.path().join("index"));
        config.embedding = EmbeddingConfig::hash(64);
        let provider = create_provider(&config.embedding).unwrap();
        (config, provider)
    }

    #[tokio::test]
    async fn test_missing_source() {
        let tmp = TempDir::new().unwrap();
        let (config, provider) = setup(&tmp);
        let err = build_index(&config, &provider).await.unwrap_err();
        assert!(matches!(err, IndexError::SourceNotFound { .. }));
        assert!(!index::index_exists(&config.index.location));
    }

    #[tokio::test]
    async fn test_source_is_a_file() {
        let tmp = TempDir::new().unwrap();
        let (config, provider) = setup(&tmp);
        std::fs::write(&config.corpus.source_directory, "dosya").unwrap();
        let err = build_index(&config, &provider).await.unwrap_err();
        assert!(matches!(err, IndexError::SourceNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_source() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let (config, provider) = setup(&tmp);
        let src = &config.corpus.source_directory;
        std::fs::create_dir_all(src).unwrap();
        std::fs::write(src.join("a.txt"), "Pilav").unwrap();
        std::fs::set_permissions(src, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores directory permissions.
        if std::fs::read_dir(src).is_ok() {
            std::fs::set_permissions(src, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = build_index(&config, &provider).await;
        std::fs::set_permissions(src, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(IndexError::SourceNotFound { .. })));
        assert!(!index::index_exists(&config.index.location));
    }

    #[tokio::test]
    async fn test_whitespace_corpus_is_empty() {
        let tmp = TempDir::new().unwrap();
        let (config, provider) = setup(&tmp);
        std::fs::create_dir_all(&config.corpus.source_directory).unwrap();
        std::fs::write(config.corpus.source_directory.join("bos.txt"), " \n\n ").unwrap();

        let outcome = build_index(&config, &provider).await.unwrap();
        assert_eq!(outcome, BuildOutcome::EmptyCorpus);
        assert!(!config.index.location.exists());
    }

    #[tokio::test]
    async fn test_builds_and_reports_counts() {
        let tmp = TempDir::new().unwrap();
        let (mut config, provider) = setup(&tmp);
        config.chunking.max_chars = 40;
        let src = &config.corpus.source_directory;
        std::fs::create_dir_all(src).unwrap();
        std::fs::write(src.join("ayran.txt"), "Ayran: yoğurt, su, tuz.").unwrap();
        std::fs::write(
            src.join("corba.txt"),
            "Mercimeği yıkayın.\n\nSoğanı kavurun, suyu ekleyin.",
        )
        .unwrap();
        std::fs::write(src.join("bos.txt"), "").unwrap();

        let outcome = build_index(&config, &provider).await.unwrap();
        assert_eq!(
            outcome,
            BuildOutcome::Built(BuildStats {
                documents: 2,
                chunks: 3
            })
        );

        let manifest = index::read_manifest(&config.index.location).await.unwrap();
        assert_eq!(manifest.model, "hash-64");
        assert_eq!(manifest.dims, 64);
        assert_eq!(manifest.documents, 2);
        assert_eq!(manifest.chunks, 3);
    }

    #[tokio::test]
    async fn test_unwritable_location_leaves_no_staging() {
        let tmp = TempDir::new().unwrap();
        let (mut config, provider) = setup(&tmp);
        std::fs::create_dir_all(&config.corpus.source_directory).unwrap();
        std::fs::write(config.corpus.source_directory.join("a.txt"), "Pilav").unwrap();

        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        config.index.location = blocker.join("index");

        let err = build_index(&config, &provider).await.unwrap_err();
        assert!(matches!(err, IndexError::BuildFailed(_)));
        assert!(blocker.is_file());
    }
}

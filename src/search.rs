//! Recipe retrieval: semantic candidates refined by exact keywords.
//!
//! # Pipeline
//!
//! ```text
//! query ──▶ keywords ─────────────────────────────┐
//!   │                                             ▼
//!   └──▶ embed ──▶ nearest N (oversample) ──▶ contains all? ──▶ dedup text ──▶ top K
//! ```
//!
//! 1. A blank query returns nothing without touching the index.
//! 2. If no index exists yet, one is built from the configured corpus
//!    (a missing or empty corpus simply yields no results).
//! 3. The query is embedded and the `candidate_oversample` nearest chunks
//!    are fetched, best first.
//! 4. A candidate survives only if its lowercased text contains every
//!    keyword as a substring. No keywords means every candidate survives.
//! 5. Exact-duplicate texts are dropped, keeping the better-ranked one.
//! 6. At most `max_results` hits are returned.
//!
//! # Concurrency
//!
//! [`RecipeSearch`] guards the index location with a reader/writer lock:
//! queries hold the read side, builds the write side. A query never sees a
//! half-published index, and concurrent queries that find no index trigger
//! a single lazy build.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::embedding::{self, SharedProvider};
use crate::error::{IndexError, SearchError};
use crate::index;
use crate::indexer;
use crate::keywords::{contains_all, KeywordExtractor};
use crate::models::{BuildOutcome, IndexManifest, SearchHit};

/// Query handle over one configured corpus and index.
///
/// Construct once and share (e.g. in an `Arc`); the embedding provider is
/// created here and reused for every build and query.
pub struct RecipeSearch {
    config: Config,
    provider: SharedProvider,
    extractor: KeywordExtractor,
    lock: RwLock<()>,
    query_failures: AtomicU64,
}

impl RecipeSearch {
    /// Validate `config` and create its embedding provider.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        let provider = embedding::create_provider(&config.embedding)?;
        Ok(Self::with_provider(config, provider))
    }

    /// Use an already constructed provider.
    pub fn with_provider(config: Config, provider: SharedProvider) -> Self {
        let extractor = KeywordExtractor::new(
            &config.retrieval.stop_words,
            config.retrieval.min_keyword_length,
        );
        Self {
            config,
            provider,
            extractor,
            lock: RwLock::new(()),
            query_failures: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Keywords this handle would require for `query`.
    pub fn keywords(&self, query: &str) -> Vec<String> {
        self.extractor.extract(query)
    }

    /// Rebuild the index from the configured corpus.
    pub async fn build_index(&self) -> Result<BuildOutcome, IndexError> {
        let _guard = self.lock.write().await;
        indexer::build_index(&self.config, &self.provider).await
    }

    pub fn index_exists(&self) -> bool {
        index::index_exists(&self.config.index.location)
    }

    /// Number of queries whose failure [`search`](Self::search) absorbed.
    pub fn query_failures(&self) -> u64 {
        self.query_failures.load(Ordering::Relaxed)
    }

    /// Manifest of the current index, or `None` if there is none.
    pub async fn status(&self) -> anyhow::Result<Option<IndexManifest>> {
        let _guard = self.lock.read().await;
        if !self.index_exists() {
            return Ok(None);
        }
        Ok(Some(index::read_manifest(&self.config.index.location).await?))
    }

    /// Run a query, turning any failure into an empty result.
    ///
    /// Failures are logged and counted in [`query_failures`](Self::query_failures);
    /// use [`try_search`](Self::try_search) to receive them instead.
    pub async fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit> {
        match self.try_search(query, max_results).await {
            Ok(hits) => hits,
            Err(e) => {
                self.query_failures.fetch_add(1, Ordering::Relaxed);
                let e = anyhow::Error::from(e);
                tracing::error!(error = %format!("{:#}", e), query, "recipe search failed");
                Vec::new()
            }
        }
    }

    /// Run a query and report failures.
    ///
    /// A missing or empty corpus is not a failure: it yields `Ok(vec![])`.
    pub async fn try_search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let keywords = self.extractor.extract(query);
        let location = &self.config.index.location;

        let mut guard = self.lock.read().await;
        if !index::index_exists(location) {
            drop(guard);
            if !self.ensure_index().await? {
                return Ok(Vec::new());
            }
            guard = self.lock.read().await;
            if !index::index_exists(location) {
                return Ok(Vec::new());
            }
        }

        let query_vec = embedding::embed_query(&self.provider, query)
            .await
            .map_err(SearchError::QueryFailed)?;
        let candidates = index::nearest(
            location,
            self.provider.model_name(),
            &query_vec,
            self.config.retrieval.candidate_oversample,
        )
        .await
        .map_err(SearchError::QueryFailed)?;
        drop(guard);

        let total = candidates.len();
        let hits = refine(candidates, &keywords, max_results);

        tracing::debug!(
            ?keywords,
            candidates = total,
            results = hits.len(),
            "recipe search"
        );

        Ok(hits)
    }

    /// Build the index if it is still missing once the write lock is held.
    /// Returns `false` when there is nothing to search.
    async fn ensure_index(&self) -> Result<bool, SearchError> {
        let _guard = self.lock.write().await;
        if self.index_exists() {
            return Ok(true);
        }

        match indexer::build_index(&self.config, &self.provider).await {
            Ok(BuildOutcome::Built(_)) => Ok(true),
            Ok(BuildOutcome::EmptyCorpus) => Ok(false),
            Err(IndexError::SourceNotFound { path }) => {
                tracing::warn!(path = %path.display(), "recipe directory not found");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Keep candidates containing every keyword, drop repeated texts and cap
/// the list at `max_results`. Input order (similarity rank) is preserved.
pub fn refine(candidates: Vec<SearchHit>, keywords: &[String], max_results: usize) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|hit| contains_all(&hit.text, keywords))
        .filter(|hit| seen.insert(hit.text.clone()))
        .take(max_results)
        .collect()
}

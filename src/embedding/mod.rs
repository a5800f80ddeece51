//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **`LocalProvider`**: runs a sentence-embedding model locally via
//!   fastembed (feature `local-embeddings`). The model is downloaded on first
//!   use and loaded once per provider instance.
//! - **[`OllamaProvider`]**: calls a local Ollama instance's `/api/embed` endpoint.
//! - **[`HashProvider`]**: deterministic feature-hashing embedder with no
//!   model files; suitable for offline use and tests.
//!
//! Also provides vector utilities used by the index:
//! - [`cosine_similarity`]: similarity between two embedding vectors
//! - [`vec_to_blob`] / [`blob_to_vec`]: little-endian `f32` BLOB encoding
//!
//! # Sharing
//!
//! Providers are created once with [`create_provider`] and shared as a
//! [`SharedProvider`] (`Arc<dyn EmbeddingProvider>`). Embedding calls block,
//! so async callers go through [`embed_texts`] / [`embed_query`], which run
//! the provider on tokio's blocking pool.
//!
//! # Retry Strategy
//!
//! The Ollama provider retries transient errors with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

mod hashing;

pub use hashing::HashProvider;

use anyhow::{bail, Context, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// Trait for embedding providers.
///
/// `embed` is a blocking call. Implementations must return one vector of
/// exactly [`dims`](EmbeddingProvider::dims) values per input text, in
/// input order.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// A provider shared across the indexer and retriever.
pub type SharedProvider = Arc<dyn EmbeddingProvider>;

/// Embed a batch of texts on the blocking pool and check the output shape.
pub async fn embed_texts(provider: &SharedProvider, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
    let expected = texts.len();
    let dims = provider.dims();
    let worker = Arc::clone(provider);

    let vectors = tokio::task::spawn_blocking(move || worker.embed(&texts))
        .await
        .context("Embedding task panicked")??;

    if vectors.len() != expected {
        bail!(
            "Embedding provider '{}' returned {} vectors for {} texts",
            provider.model_name(),
            vectors.len(),
            expected
        );
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        bail!(
            "Embedding provider '{}' returned a {}-dimensional vector, expected {}",
            provider.model_name(),
            bad.len(),
            dims
        );
    }

    Ok(vectors)
}

/// Embed texts in batches of `batch_size`, preserving order.
pub async fn embed_batched(
    provider: &SharedProvider,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        vectors.extend(embed_texts(provider, batch.to_vec()).await?);
    }
    Ok(vectors)
}

/// Embed a single query text.
pub async fn embed_query(provider: &SharedProvider, text: &str) -> Result<Vec<f32>> {
    let results = embed_texts(provider, vec![text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

/// Run `f` on the value in `slot`, loading it first if the slot is empty.
///
/// The lock is held across the load, so concurrent first callers wait for a
/// single load. A failed load leaves the slot empty for the next caller.
#[cfg_attr(not(feature = "local-embeddings"), allow(dead_code))]
fn with_loaded<T, R>(
    slot: &Mutex<Option<T>>,
    load: impl FnOnce() -> Result<T>,
    f: impl FnOnce(&mut T) -> Result<R>,
) -> Result<R> {
    let mut guard = slot
        .lock()
        .map_err(|_| anyhow::anyhow!("Embedding model lock poisoned"))?;
    let value = match guard.take() {
        Some(value) => value,
        None => load()?,
    };
    f(guard.insert(value))
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured Ollama URL (default: `http://localhost:11434`).
/// Requires Ollama to be running with an embedding model pulled (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaProvider {
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(Self {
            model,
            dims,
            url,
            max_retries: config.max_retries,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(attempt, ?delay, "retrying Ollama embedding request");
                std::thread::sleep(delay);
            }

            let resp = client
                .post(format!("{}/api/embed", self.url))
                .header("Content-Type", "application/json")
                .json(&body)
                .send();

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json()?;
                        return parse_ollama_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Ollama API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().unwrap_or_default();
                    bail!("Ollama API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(anyhow::anyhow!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url,
                        e
                    ));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Ollama embedding failed after retries")))
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;

    let mut result = Vec::with_capacity(embeddings.len());

    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: embedding is not an array"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }

    Ok(result)
}

// ============ Local Provider (fastembed) ============

#[cfg(feature = "local-embeddings")]
pub use local::LocalProvider;

#[cfg(feature = "local-embeddings")]
mod local {
    use anyhow::{bail, Result};
    use std::sync::Mutex;

    use super::{with_loaded, EmbeddingProvider};
    use crate::config::EmbeddingConfig;

    /// Embedding provider for local inference with fastembed.
    ///
    /// The model is fetched from Hugging Face on first use and cached; after
    /// that, embeddings run entirely offline. The engine is loaded under the
    /// same mutex that serializes inference, so it loads once per provider and
    /// a failed load is retried on the next call.
    pub struct LocalProvider {
        model_name: String,
        dims: usize,
        model: fastembed::EmbeddingModel,
        batch_size: usize,
        engine: Mutex<Option<fastembed::TextEmbedding>>,
    }

    impl LocalProvider {
        pub fn new(config: &EmbeddingConfig) -> Result<Self> {
            let model_name = config
                .model
                .clone()
                .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
            let model = config_to_fastembed_model(&model_name)?;
            let dims = config.dims.unwrap_or_else(|| default_dims(&model_name));

            Ok(Self {
                model_name,
                dims,
                model,
                batch_size: config.batch_size,
                engine: Mutex::new(None),
            })
        }

        fn load(&self) -> Result<fastembed::TextEmbedding> {
            tracing::info!(model = %self.model_name, "loading local embedding model");
            fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(self.model.clone()).with_show_download_progress(true),
            )
            .map_err(|e| anyhow::anyhow!("Failed to initialize local embedding model: {}", e))
        }
    }

    impl EmbeddingProvider for LocalProvider {
        fn model_name(&self) -> &str {
            &self.model_name
        }

        fn dims(&self) -> usize {
            self.dims
        }

        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            with_loaded(
                &self.engine,
                || self.load(),
                |engine| {
                    engine
                        .embed(texts.to_vec(), Some(self.batch_size))
                        .map_err(|e| anyhow::anyhow!("Local embedding failed: {}", e))
                },
            )
        }
    }

    fn default_dims(model_name: &str) -> usize {
        match model_name {
            "all-minilm-l6-v2" => 384,
            "bge-small-en-v1.5" => 384,
            "bge-base-en-v1.5" => 768,
            "multilingual-e5-small" => 384,
            "multilingual-e5-base" => 768,
            "multilingual-e5-large" => 1024,
            _ => 384,
        }
    }

    fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
        match name {
            "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
            "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
            "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
            other => bail!(
                "Unknown local embedding model: '{}'. Supported models: \
                 all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, \
                 multilingual-e5-small, multilingual-e5-base, multilingual-e5-large",
                other
            ),
        }
    }
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"local"` | `LocalProvider` (requires feature `local-embeddings`) |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"hash"` | [`HashProvider`] |
///
/// Construction is cheap; the local model is not loaded until the first
/// embedding call.
pub fn create_provider(config: &EmbeddingConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Arc::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        "hash" => Ok(Arc::new(HashProvider::new(
            config.dims.unwrap_or(hashing::DEFAULT_DIMS),
        ))),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use recipe_agent::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

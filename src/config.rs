//! TOML configuration for the recipe agent.
//!
//! Every section is optional. A missing file section, or a missing key
//! inside a section, falls back to the documented default, so an empty
//! file is a valid configuration:
//!
//! ```toml
//! [corpus]
//! source_directory = "recipes"
//!
//! [index]
//! location = "index"
//!
//! [chunking]
//! max_chars = 1000
//!
//! [retrieval]
//! candidate_oversample = 20
//! max_results = 5
//! min_keyword_length = 3
//!
//! [embedding]
//! provider = "local"
//! model = "all-minilm-l6-v2"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::keywords::DEFAULT_STOP_WORDS;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_source_directory")]
    pub source_directory: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            source_directory: default_source_directory(),
        }
    }
}

fn default_source_directory() -> PathBuf {
    PathBuf::from("recipes")
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_location")]
    pub location: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            location: default_index_location(),
        }
    }
}

fn default_index_location() -> PathBuf {
    PathBuf::from("index")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_candidate_oversample")]
    pub candidate_oversample: usize,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_min_keyword_length")]
    pub min_keyword_length: usize,
    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_oversample: default_candidate_oversample(),
            max_results: default_max_results(),
            min_keyword_length: default_min_keyword_length(),
            stop_words: default_stop_words(),
        }
    }
}

fn default_candidate_oversample() -> usize {
    20
}
fn default_max_results() -> usize {
    5
}
fn default_min_keyword_length() -> usize {
    3
}
fn default_stop_words() -> Vec<String> {
    DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    /// Offline embedder configuration, used by tests and air-gapped setups.
    pub fn hash(dims: usize) -> Self {
        Self {
            provider: "hash".to_string(),
            dims: Some(dims),
            ..Self::default()
        }
    }
}

impl Config {
    /// Configuration rooted at explicit corpus and index directories, with
    /// every other option at its default.
    pub fn with_paths(source_directory: impl Into<PathBuf>, index_location: impl Into<PathBuf>) -> Self {
        Self {
            corpus: CorpusConfig {
                source_directory: source_directory.into(),
            },
            index: IndexConfig {
                location: index_location.into(),
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chars == 0 {
            anyhow::bail!("chunking.max_chars must be > 0");
        }

        if self.retrieval.max_results < 1 {
            anyhow::bail!("retrieval.max_results must be >= 1");
        }

        if self.retrieval.candidate_oversample < self.retrieval.max_results {
            anyhow::bail!(
                "retrieval.candidate_oversample ({}) must be >= retrieval.max_results ({})",
                self.retrieval.candidate_oversample,
                self.retrieval.max_results
            );
        }

        if self.embedding.dims == Some(0) {
            anyhow::bail!("embedding.dims must be > 0");
        }

        if self.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }

        match self.embedding.provider.as_str() {
            "local" | "ollama" | "hash" => {}
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be local, ollama, or hash.",
                other
            ),
        }

        if self.embedding.provider == "ollama" {
            if self.embedding.model.is_none() {
                anyhow::bail!("embedding.model must be specified when provider is 'ollama'");
            }
            if self.embedding.dims.is_none() {
                anyhow::bail!("embedding.dims must be specified when provider is 'ollama'");
            }
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

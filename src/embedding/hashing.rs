//! Feature-hashing embedder.
//!
//! Maps each lowercase word and each character trigram of a word (padded
//! with `^`/`$`) to a signed bucket chosen by SHA-256, sums the weights and
//! L2-normalizes. Texts sharing words or word fragments land close under
//! cosine similarity. No model files, fully deterministic.

use anyhow::Result;
use sha2::{Digest, Sha256};

use super::EmbeddingProvider;

pub(crate) const DEFAULT_DIMS: usize = 256;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

pub struct HashProvider {
    model_name: String,
    dims: usize,
}

impl HashProvider {
    pub fn new(dims: usize) -> Self {
        let dims = dims.max(1);
        Self {
            model_name: format!("hash-{}", dims),
            dims,
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dims];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            self.add_feature(&mut v, "w", word, WORD_WEIGHT);

            let padded: Vec<char> = std::iter::once('^')
                .chain(word.chars())
                .chain(std::iter::once('$'))
                .collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.add_feature(&mut v, "g", &gram, TRIGRAM_WEIGHT);
            }
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }

    fn add_feature(&self, v: &mut [f32], kind: &str, feature: &str, weight: f32) {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update([0u8]);
        hasher.update(feature.as_bytes());
        let digest = hasher.finalize();

        let bucket = u64::from_le_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
        ]) as usize
            % self.dims;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign * weight;
    }
}

impl EmbeddingProvider for HashProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

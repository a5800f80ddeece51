//! Query keyword extraction.
//!
//! Keywords are the lowercase letter runs of a query that survive the
//! stop-word list and the minimum-length rule. The retriever requires every
//! keyword to appear verbatim in a candidate chunk.
//!
//! A letter run is a maximal sequence of ASCII `a`–`z` plus the Turkish
//! letters `ç ğ ı ö ş ü`. Anything else (digits, punctuation, combining
//! marks, other scripts) separates tokens.

use std::collections::HashSet;

/// Turkish function and domain words that carry no discriminating content
/// for recipe lookups.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "olan",
    "tarif",
    "tarifleri",
    "tarifler",
    "yemek",
    "yemekler",
    "öner",
    "önerir",
    "önerisi",
    "bul",
    "bulur",
    "getir",
    "ne",
    "ile",
    "içinde",
    "içeren",
    "içerir",
    "kullanılan",
    "kullan",
    "bana",
    "bir",
    "mi",
    "mu",
    "mı",
    "var",
    "listele",
];

const TURKISH_LETTERS: [char; 6] = ['ç', 'ğ', 'ı', 'ö', 'ş', 'ü'];

/// Stop-word set plus minimum length, built once from configuration.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    stop_words: HashSet<String>,
    min_len: usize,
}

impl KeywordExtractor {
    pub fn new<I, S>(stop_words: I, min_len: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stop_words: stop_words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
            min_len,
        }
    }

    /// Extract keywords in order of first appearance. Repeated words are
    /// kept once.
    pub fn extract(&self, query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        let mut seen = HashSet::new();
        tokenize(&lowered)
            .filter(|token| token.chars().count() >= self.min_len)
            .filter(|token| !self.stop_words.contains(*token))
            .filter(|token| seen.insert(*token))
            .map(str::to_string)
            .collect()
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_WORDS.iter().copied(), 3)
    }
}

/// Extract keywords with the reference stop-word set and minimum length 3.
pub fn extract_keywords(query: &str) -> Vec<String> {
    KeywordExtractor::default().extract(query)
}

/// True when `text` contains every keyword, compared case-insensitively.
/// An empty keyword list matches everything.
pub fn contains_all(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let lowered = text.to_lowercase();
    keywords.iter().all(|k| lowered.contains(k.as_str()))
}

fn is_keyword_char(c: char) -> bool {
    c.is_ascii_lowercase() || TURKISH_LETTERS.contains(&c)
}

fn tokenize(lowered: &str) -> impl Iterator<Item = &str> {
    lowered
        .split(|c: char| !is_keyword_char(c))
        .filter(|token| !token.is_empty())
}

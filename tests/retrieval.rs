//! End-to-end retrieval through the library API, using the hash embedder so
//! no model is downloaded.

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use recipe_agent::config::{Config, EmbeddingConfig};
use recipe_agent::embedding::{EmbeddingProvider, HashProvider, SharedProvider};
use recipe_agent::keywords::extract_keywords;
use recipe_agent::models::{BuildOutcome, BuildStats};
use recipe_agent::{IndexError, RecipeSearch, SearchError};

const RECIPES: &[(&str, &str)] = &[
    ("domates_corbasi.txt", "Domates çorbası: domates, su, tuz ile hazırlanır."),
    ("mercimek.txt", "Mercimek çorbası: kırmızı mercimek, soğan, havuç, tereyağı."),
    ("karniyarik.txt", "Karnıyarık: patlıcan, kıyma, soğan, domates, biber."),
    ("pilav.txt", "Pirinç pilavı: pirinç, tereyağı, tuz, su."),
    ("cacik.txt", "Cacık: yoğurt, salatalık, sarımsak, nane."),
    ("menemen.txt", "Menemen: yumurta, domates, biber, zeytinyağı."),
    ("ayran.txt", "Ayran: yoğurt, su, tuz."),
    ("kopya.txt", "Ayran: yoğurt, su, tuz."),
];

fn config(tmp: &TempDir) -> Config {
    let mut config = Config::with_paths(tmp.path().join("recipes"), tmp.path().join("index"));
    config.embedding = EmbeddingConfig::hash(256);
    config
}

fn write_recipes(dir: &Path, recipes: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, text) in recipes {
        fs::write(dir.join(name), text).unwrap();
    }
}

fn corpus_search(tmp: &TempDir) -> RecipeSearch {
    let config = config(tmp);
    write_recipes(&config.corpus.source_directory, RECIPES);
    RecipeSearch::new(config).unwrap()
}

/// Embeds like the hash provider but always fails.
struct FailingProvider;

impl EmbeddingProvider for FailingProvider {
    fn model_name(&self) -> &str {
        "hash-256"
    }
    fn dims(&self) -> usize {
        256
    }
    fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        anyhow::bail!("embedding service unavailable")
    }
}

#[tokio::test]
async fn test_keyword_example_from_corpus() {
    let tmp = TempDir::new().unwrap();
    let config = config(&tmp);
    write_recipes(
        &config.corpus.source_directory,
        &[("corba.txt", "Domates çorbası: domates, su, tuz ile hazırlanır.")],
    );
    let search = RecipeSearch::new(config).unwrap();

    assert_eq!(extract_keywords("domates içeren tarif"), vec!["domates"]);

    let hits = search.search("domates içeren tarif", 5).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "Domates çorbası: domates, su, tuz ile hazırlanır.");
    assert_eq!(hits[0].document_path, "corba.txt");

    assert!(search.search("patlıcan", 5).await.is_empty());
    assert_eq!(search.query_failures(), 0);
}

#[tokio::test]
async fn test_results_contain_every_keyword() {
    let tmp = TempDir::new().unwrap();
    let search = corpus_search(&tmp);

    for query in ["domates", "soğan domates", "yoğurt tuz", "tereyağı", "biber yumurta"] {
        let keywords = extract_keywords(query);
        let hits = search.search(query, 5).await;
        assert!(!hits.is_empty(), "no hits for {:?}", query);
        for hit in &hits {
            let lowered = hit.text.to_lowercase();
            for k in &keywords {
                assert!(lowered.contains(k.as_str()), "{:?} lacks {:?}", hit.text, k);
            }
        }
    }
}

#[tokio::test]
async fn test_stop_word_query_returns_top_by_rank() {
    let tmp = TempDir::new().unwrap();
    let search = corpus_search(&tmp);

    assert!(extract_keywords("tarif öner").is_empty());

    let hits = search.search("tarif öner", 5).await;
    assert_eq!(hits.len(), 5);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_results_bounded_and_distinct() {
    let tmp = TempDir::new().unwrap();
    let search = corpus_search(&tmp);

    for max in [1, 3, 5, 20] {
        let hits = search.search("ayran yoğurt su tuz", max).await;
        assert!(hits.len() <= max);
        let mut texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        let before = texts.len();
        texts.sort();
        texts.dedup();
        assert_eq!(texts.len(), before, "duplicate texts returned");
    }

    // Two files share the ayran text; only one survives.
    let hits = search.search("ayran", 5).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document_path, "ayran.txt");
}

#[tokio::test]
async fn test_unique_term_finds_its_chunk() {
    let tmp = TempDir::new().unwrap();
    let search = corpus_search(&tmp);

    let outcome = search.build_index().await.unwrap();
    assert_eq!(
        outcome,
        BuildOutcome::Built(BuildStats {
            documents: RECIPES.len(),
            chunks: RECIPES.len()
        })
    );

    let hits = search.search("salatalık", 5).await;
    assert_eq!(hits.len(), 1);
    assert!(hits[0].text.starts_with("Cacık"));
}

#[tokio::test]
async fn test_absent_and_empty_corpus() {
    let tmp = TempDir::new().unwrap();
    let config = config(&tmp);
    let search = RecipeSearch::new(config.clone()).unwrap();

    assert!(search.try_search("domates", 5).await.unwrap().is_empty());
    assert!(matches!(
        search.build_index().await,
        Err(IndexError::SourceNotFound { .. })
    ));

    fs::create_dir_all(&config.corpus.source_directory).unwrap();
    assert!(search.try_search("domates", 5).await.unwrap().is_empty());
    assert_eq!(search.build_index().await.unwrap(), BuildOutcome::EmptyCorpus);
    assert!(!search.index_exists());
    assert_eq!(search.query_failures(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_corpus_is_empty_not_error() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let config = config(&tmp);
    let src = config.corpus.source_directory.clone();
    write_recipes(&src, RECIPES);
    fs::set_permissions(&src, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&src).is_ok() {
        // Running as root: permissions are not enforced.
        fs::set_permissions(&src, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let search = RecipeSearch::new(config).unwrap();
    let first = search.try_search("domates", 5).await;
    let second = search.search("domates", 5).await;
    fs::set_permissions(&src, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(first.unwrap().is_empty());
    assert!(second.is_empty());
    assert_eq!(search.query_failures(), 0);
}

#[tokio::test]
async fn test_lazy_build_on_first_query() {
    let tmp = TempDir::new().unwrap();
    let search = corpus_search(&tmp);
    assert!(!search.index_exists());

    let hits = search.search("mercimek", 5).await;
    assert_eq!(hits.len(), 1);
    assert!(search.index_exists());

    let manifest = search.status().await.unwrap().unwrap();
    assert_eq!(manifest.model, "hash-256");
    assert_eq!(manifest.chunks, RECIPES.len() as i64);
}

#[tokio::test]
async fn test_rebuild_gives_identical_results() {
    let tmp = TempDir::new().unwrap();
    let search = corpus_search(&tmp);

    search.build_index().await.unwrap();
    let first = search.search("domates", 5).await;
    search.build_index().await.unwrap();
    let second = search.search("domates", 5).await;

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failed_build_keeps_previous_index() {
    let tmp = TempDir::new().unwrap();
    let search = corpus_search(&tmp);
    search.build_index().await.unwrap();
    let before = search.search("domates", 5).await;

    let failing: SharedProvider = Arc::new(FailingProvider);
    let broken = RecipeSearch::with_provider(search.config().clone(), failing);
    let err = broken.build_index().await.unwrap_err();
    assert!(matches!(err, IndexError::BuildFailed(_)));
    let message = format!("{:#}", anyhow::Error::from(err));
    assert_eq!(message.matches("embedding service unavailable").count(), 1);

    assert!(search.index_exists());
    assert_eq!(search.search("domates", 5).await, before);

    let leftovers: Vec<String> = fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| n.contains(".staging-") || n.contains(".old-"))
        .collect();
    assert!(leftovers.is_empty(), "leftovers: {:?}", leftovers);
}

#[tokio::test]
async fn test_lazy_build_failure_is_contained() {
    let tmp = TempDir::new().unwrap();
    let config = config(&tmp);
    write_recipes(&config.corpus.source_directory, RECIPES);
    let search = RecipeSearch::with_provider(config, Arc::new(FailingProvider));

    assert!(matches!(
        search.try_search("domates", 5).await,
        Err(SearchError::Build(IndexError::BuildFailed(_)))
    ));
    assert!(search.search("domates", 5).await.is_empty());
    assert_eq!(search.query_failures(), 1);
    assert!(!search.index_exists());
}

#[tokio::test]
async fn test_model_mismatch_is_query_failure() {
    let tmp = TempDir::new().unwrap();
    let search = corpus_search(&tmp);
    search.build_index().await.unwrap();

    let other: SharedProvider = Arc::new(HashProvider::new(64));
    let mismatched = RecipeSearch::with_provider(search.config().clone(), other);

    assert!(matches!(
        mismatched.try_search("domates", 5).await,
        Err(SearchError::QueryFailed(_))
    ));
    assert!(mismatched.search("domates", 5).await.is_empty());
    assert_eq!(mismatched.query_failures(), 1);
}

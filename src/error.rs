//! Typed errors at the public boundary.
//!
//! Internals use `anyhow` with context; the indexer and retriever convert
//! into these enums so callers can tell "no recipes" apart from
//! "something broke". The wrapped cause is reachable through
//! `Error::source`, so print with `{:#}` on an `anyhow::Error` to see the
//! whole chain.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Recipe directory not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Index build failed")]
    BuildFailed(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Query failed")]
    QueryFailed(#[source] anyhow::Error),

    #[error(transparent)]
    Build(#[from] IndexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_chain_printed_once() {
        let cause = anyhow::anyhow!("disk full").context("Failed to write staging index");
        let err = IndexError::BuildFailed(cause);
        assert_eq!(err.to_string(), "Index build failed");

        let chained = format!("{:#}", anyhow::Error::from(SearchError::from(err)));
        assert_eq!(
            chained,
            "Index build failed: Failed to write staging index: disk full"
        );
    }

    #[test]
    fn test_source_not_found_message() {
        let err = IndexError::SourceNotFound {
            path: PathBuf::from("tarifler"),
        };
        assert_eq!(err.to_string(), "Recipe directory not found: tarifler");
    }
}

//! # Recipe Agent
//!
//! A local recipe lookup assistant. Recipes live as plain `.txt` files in a
//! directory; the agent indexes them once and answers free-text queries by
//! combining semantic nearest-neighbour search with exact keyword filtering.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  recipes/   │──▶│  Indexer    │──▶│ index/       │
//! │  *.txt      │   │ Chunk+Embed │   │ index.sqlite │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │
//!                                            ▼
//!                   ┌──────────┐       ┌───────────┐
//!                   │   CLI    │◀──────│ Retriever │
//!                   │ (recipe) │       │ kNN+filter│
//!                   └──────────┘       └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! recipe build                          # index ./recipes into ./index
//! recipe search "domates içeren tarif"  # up to 5 matching chunks
//! recipe status                         # what the index holds
//! ```
//!
//! ## Library use
//!
//! ```rust,no_run
//! use recipe_agent::config::Config;
//! use recipe_agent::search::RecipeSearch;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let search = RecipeSearch::new(Config::with_paths("recipes", "index"))?;
//! for hit in search.search("mercimek çorbası", 5).await {
//!     println!("{}", hit.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed build and query errors |
//! | [`corpus`] | Recipe file discovery |
//! | [`chunk`] | Text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`keywords`] | Query keyword extraction |
//! | [`index`] | On-disk vector index |
//! | [`indexer`] | Index build pipeline |
//! | [`search`] | Retrieval and refinement |
//! | [`status`] | Index status report |
//! | [`db`] | Database connections |
//! | [`migrate`] | Index schema |
//! | [`logging`] | Diagnostic log setup |

pub mod chunk;
pub mod config;
pub mod corpus;
pub mod db;
pub mod embedding;
pub mod error;
pub mod index;
pub mod indexer;
pub mod keywords;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod search;
pub mod status;

pub use error::{IndexError, SearchError};
pub use indexer::build_index;
pub use keywords::extract_keywords;
pub use search::RecipeSearch;

//! # Recipe Agent CLI (`recipe`)
//!
//! Command-line front-end over the `recipe_agent` library.
//!
//! ## Usage
//!
//! ```bash
//! recipe --config ./config/recipes.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `recipe build` | Rebuild the index from the recipe directory |
//! | `recipe search "<query>"` | Find matching recipes |
//! | `recipe status` | Show what the index holds |
//! | `recipe keywords "<query>"` | Show the keywords a query must match |
//!
//! If the config file does not exist, built-in defaults are used
//! (`recipes/` as the corpus, `index/` as the index location).

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use recipe_agent::config::{self, Config};
use recipe_agent::keywords::KeywordExtractor;
use recipe_agent::logging;
use recipe_agent::models::{BuildOutcome, SearchHit};
use recipe_agent::search::RecipeSearch;
use recipe_agent::status;

/// Recipe Agent: semantic recipe search refined by exact keywords.
#[derive(Parser)]
#[command(
    name = "recipe",
    about = "Recipe Agent: find recipes in a local text collection",
    version,
    long_about = "Recipe Agent indexes a directory of plain-text recipes with sentence \
    embeddings and answers free-text queries. Results are the nearest recipe chunks that \
    also contain every keyword of the query."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/recipes.toml`. Built-in defaults apply when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/recipes.toml")]
    config: PathBuf,

    /// Increase log verbosity on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index.
    ///
    /// Reads every `.txt` file under the recipe directory, chunks and embeds
    /// it, and atomically replaces the index. The previous index survives a
    /// failed build.
    Build,

    /// Search recipes.
    ///
    /// Builds the index first if none exists.
    Search {
        /// Free-text query, e.g. "domates içeren tarif".
        query: String,

        /// Maximum number of results (defaults to `retrieval.max_results`).
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as a JSON array.
        #[arg(long)]
        json: bool,
    },

    /// Show index status.
    Status,

    /// Show the keywords extracted from a query.
    Keywords {
        query: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(logging::level_for_verbosity(cli.verbose));

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let cfg = load_or_default(&cli.config)?;

    match cli.command {
        Commands::Build => {
            let search = open(cfg)?;
            match search.build_index().await {
                Ok(BuildOutcome::Built(stats)) => {
                    println!("build");
                    println!("  documents: {}", stats.documents);
                    println!("  chunks: {}", stats.chunks);
                    println!("  index: {}", search.config().index.location.display());
                    println!("ok");
                }
                Ok(BuildOutcome::EmptyCorpus) => {
                    println!(
                        "No recipe text found in {}; index not built.",
                        search.config().corpus.source_directory.display()
                    );
                }
                Err(e) => {
                    eprintln!("Error: {:#}", anyhow::Error::from(e));
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Search { query, limit, json } => {
            if query.trim().is_empty() {
                println!("Please enter a query.");
                return Ok(ExitCode::SUCCESS);
            }
            let search = open(cfg)?;
            let max_results = limit.unwrap_or(search.config().retrieval.max_results);
            let hits = search.try_search(&query, max_results).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                print_hits(&hits);
            }
        }
        Commands::Status => {
            let search = open(cfg)?;
            status::run_status(&search).await?;
        }
        Commands::Keywords { query } => {
            // No embedding provider needed.
            let extractor = KeywordExtractor::new(
                &cfg.retrieval.stop_words,
                cfg.retrieval.min_keyword_length,
            );
            print_keywords(&extractor.extract(&query));
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn open(cfg: Config) -> anyhow::Result<RecipeSearch> {
    RecipeSearch::new(cfg).context("Failed to initialize recipe search")
}

/// Load the config file, or fall back to defaults when it does not exist.
fn load_or_default(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found; using defaults");
        Ok(Config::default())
    }
}

fn print_keywords(keywords: &[String]) {
    if keywords.is_empty() {
        println!("(no keywords: results are ranked by meaning only)");
    } else {
        for k in keywords {
            println!("{}", k);
        }
    }
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No matching recipes found.");
        return;
    }

    for (i, hit) in hits.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!(
            "Recipe {}  ({}, score {:.2})",
            i + 1,
            hit.document_path,
            hit.score
        );
        println!("{}", "-".repeat(40));
        println!("{}", hit.text);
    }
}

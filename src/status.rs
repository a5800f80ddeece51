//! Index status overview.
//!
//! Summarizes what the current index holds and when it was built. Used by
//! `recipe status` to check whether a rebuild is due after editing recipes.

use anyhow::Result;
use std::path::Path;

use crate::db::INDEX_FILE;
use crate::search::RecipeSearch;

/// Print the status of the index behind `search`.
pub async fn run_status(search: &RecipeSearch) -> Result<()> {
    let config = search.config();
    let location = &config.index.location;

    println!("Recipe Index Status");
    println!("===================");
    println!();
    println!("  Recipes:     {}", config.corpus.source_directory.display());
    println!("  Index:       {}", location.display());

    let Some(manifest) = search.status().await? else {
        println!();
        println!("  No index yet. Run `recipe build` or search once to create it.");
        println!();
        return Ok(());
    };

    println!("  Size:        {}", format_bytes(index_size(location)));
    println!();
    println!("  Documents:   {}", manifest.documents);
    println!("  Chunks:      {}", manifest.chunks);
    println!("  Model:       {} ({} dims)", manifest.model, manifest.dims);
    println!(
        "  Built:       {} ({})",
        format_ts_iso(manifest.built_at),
        format_ts_relative(manifest.built_at)
    );
    if manifest.source_directory != config.corpus.source_directory.display().to_string() {
        println!("  Built from:  {}", manifest.source_directory);
    }
    println!();

    Ok(())
}

fn index_size(location: &Path) -> u64 {
    std::fs::metadata(location.join(INDEX_FILE))
        .map(|m| m.len())
        .unwrap_or(0)
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp relative to now (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    relative_to(ts, chrono::Utc::now().timestamp())
}

fn relative_to(ts: i64, now: i64) -> String {
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

//! CLI `cache` commands.

use anyhow::{Context, Result};
use serde_json::Value;

use tulip::insights::GenerationType;

use super::App;

/// List which generation types currently have a cached result.
pub fn status(app: &App) -> Result<()> {
    println!("Cached results");
    println!("{}", "=".repeat(40));
    for generation in GenerationType::all() {
        match app.cache.get::<Value>(generation) {
            Some(entry) => println!("  {:<30} {}", generation.to_string(), entry.timestamp),
            None => println!("  {:<30} -", generation.to_string()),
        }
    }
    Ok(())
}

/// Drop every cached insight and suggestion.
pub fn clear(app: &App) -> Result<()> {
    app.cache
        .try_invalidate_all()
        .context("could not clear cached results")?;
    println!("Cleared all cached insights and suggestions.");
    Ok(())
}

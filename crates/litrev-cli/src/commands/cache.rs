//! Cache commands - inspect and clear the extracted-text cache.

use super::{format_size, get_paths, load_config};
use anyhow::{Context, Result};
use colored::Colorize;
use litrev_ingest::TextCache;

fn open_cache() -> Result<TextCache> {
    let paths = get_paths()?;
    let config = load_config(&paths)?;
    TextCache::open(config.cache_dir(&paths)).context("Failed to open text cache")
}

pub fn stats() -> Result<()> {
    let cache = open_cache()?;
    let stats = cache.stats().context("Failed to read text cache")?;

    println!("{}", "Text Cache".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("  Location: {}", cache.dir().display());
    println!("  Entries: {}", stats.entries.to_string().green());
    println!("  Size: {}", format_size(stats.total_bytes));

    Ok(())
}

pub fn clear() -> Result<()> {
    let cache = open_cache()?;
    let removed = cache.clear().context("Failed to clear text cache")?;

    println!(
        "{} Removed {} cached text{}",
        "✓".green(),
        removed,
        if removed == 1 { "" } else { "s" }
    );
    println!("  The next build will re-extract every document.");

    Ok(())
}

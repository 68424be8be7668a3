//! Stats command - show index and cache statistics.

use super::{format_size, get_index, get_paths, load_config};
use anyhow::Result;
use chrono::{DateTime, Local};
use colored::Colorize;
use litrev_db::Database;
use litrev_ingest::TextCache;

pub fn run() -> Result<()> {
    let paths = get_paths()?;
    let config = load_config(&paths)?;
    let index_path = config.index_path(&paths);
    let db = get_index(&config, &paths)?;
    let stats = db.get_stats()?;

    println!("{}", "Litrev Statistics".cyan().bold());
    println!("{}", "─".repeat(50));

    println!();
    println!("{}", "Index".white().bold());
    println!("  Sources: {}", stats.total_sources.to_string().green());
    println!("  Chunks: {}", stats.total_chunks);

    let mut by_type: Vec<_> = stats.chunks_by_type.iter().collect();
    by_type.sort();
    for (doc_type, count) in by_type {
        println!("    {}: {}", doc_type, count);
    }

    match &stats.embedding_model {
        Some(model) => println!(
            "  Embedded: {}/{} ({})",
            stats.embedded_chunks,
            stats.total_chunks,
            model.cyan()
        ),
        None => println!("  Embedded: {}", "none".dimmed()),
    }

    if let Some(built_at) = &stats.built_at {
        let shown = DateTime::parse_from_rfc3339(built_at)
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|_| built_at.clone());
        println!("  Built: {}", shown);
    }

    println!();
    println!("{}", "Storage".white().bold());
    let index_size = Database::file_size(&index_path)?;
    println!("  Index size: {}", format_size(index_size));

    let cache = TextCache::open(config.cache_dir(&paths))?;
    let cache_stats = cache.stats()?;
    println!(
        "  Text cache: {} entries, {}",
        cache_stats.entries,
        format_size(cache_stats.total_bytes)
    );

    Ok(())
}

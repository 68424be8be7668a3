//! Search command - semantic and full-text retrieval over the index.

use super::{get_index, get_paths, load_config, truncate};
use anyhow::{Context, Result};
use colored::Colorize;
use litrev_db::{Database, SearchHit};
use litrev_ollama::OllamaClient;
use tokio::runtime::Runtime;

pub fn run(query: &str, limit: usize, keyword: bool) -> Result<()> {
    let paths = get_paths()?;
    let config = load_config(&paths)?;
    let db = get_index(&config, &paths)?;

    let hits = if keyword {
        println!("{} \"{}\"", "Searching for:".cyan().bold(), query);
        db.keyword_search(query, limit)?
    } else {
        println!(
            "{} \"{}\" {}",
            "Semantic search for:".cyan().bold(),
            query,
            "(meaning-based)".dimmed()
        );
        semantic_hits(&db, &config.ollama, query, limit)?
    };
    println!("{}", "─".repeat(70));

    if hits.is_empty() {
        println!();
        println!("{}", "No results found.".dimmed());
        if !keyword {
            println!("  Try {} for exact-word matching", "--keyword".cyan());
        }
        return Ok(());
    }

    println!();
    println!(
        "Found {} result{}",
        hits.len().to_string().green(),
        if hits.len() == 1 { "" } else { "s" }
    );
    println!();

    for hit in &hits {
        print_hit(hit);
    }

    Ok(())
}

fn semantic_hits(
    db: &Database,
    ollama: &litrev_config::OllamaConfig,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchHit>> {
    let (embedded, total) = db.embedding_stats()?;
    if embedded == 0 {
        if total == 0 {
            anyhow::bail!("The index is empty. Run 'litrev build' first.");
        }
        anyhow::bail!(
            "The index has no embeddings. Rebuild without --no-embed or search with --keyword."
        );
    }

    let client = OllamaClient::from_config(ollama).context("Failed to create Ollama client")?;
    if let Some(built_with) = db.get_info("embedding_model")? {
        if built_with != client.model() {
            anyhow::bail!(
                "The index was embedded with '{}' but '{}' is configured. Rebuild the index.",
                built_with,
                client.model()
            );
        }
    }

    let rt = Runtime::new().context("Failed to create async runtime")?;
    if !rt.block_on(client.is_available()) {
        anyhow::bail!(
            "Ollama is not running at {}. Start it with 'ollama serve'.",
            client.host()
        );
    }

    let query_vector = rt
        .block_on(client.embed(query))
        .context("Failed to embed query")?;
    Ok(db.vector_search(&query_vector, limit, None)?)
}

fn print_hit(hit: &SearchHit) {
    let chunk = &hit.chunk;
    let source = chunk
        .metadata
        .get(litrev_core::keys::RELATIVE_PATH)
        .and_then(|v| v.as_str())
        .or_else(|| chunk.source())
        .unwrap_or("unknown source");

    let location = match chunk.page() {
        Some(page) => format!("p. {}", page),
        None => format!("chunk {}", chunk.chunk_id),
    };

    println!(
        "{} {} {}",
        "•".cyan(),
        source.white().bold(),
        format!("[{}]", location).dimmed()
    );
    println!("  {} {:.0}%", "Score:".dimmed(), hit.score * 100.0);
    println!("  {}", truncate(&chunk.content.replace('\n', " "), 200).dimmed());
    println!();
}

//! Build command - rebuild the index from a document directory.

use super::scan::{print_classes, print_skipped};
use super::{build_pipeline, get_paths, load_config, phase_spinner, track_progress};
use anyhow::{Context, Result};
use colored::Colorize;
use litrev_ingest::{Embedder, IngestError, Pipeline, PipelineReport};
use litrev_ollama::OllamaClient;
use tokio::runtime::Runtime;
use tracing::debug;

pub fn run(dir: Option<&str>, no_embed: bool) -> Result<()> {
    let paths = get_paths()?;
    let config = load_config(&paths)?;
    let pipeline = build_pipeline(&config, &paths, dir)?;
    let rt = Runtime::new().context("Failed to create async runtime")?;

    println!("{} {}", "Indexing:".cyan(), pipeline.root().display());

    let report = if config.index.embed && !no_embed {
        let client = OllamaClient::from_config(&config.ollama)
            .context("Failed to create Ollama client")?;
        if !rt.block_on(client.is_available()) {
            anyhow::bail!(
                "Ollama is not running at {}. Start it with 'ollama serve' or pass --no-embed.",
                config.ollama.host
            );
        }
        if !rt.block_on(client.has_model()).unwrap_or(false) {
            anyhow::bail!(
                "Embedding model '{}' is not installed. Run 'ollama pull {}'.",
                client.model(),
                client.model()
            );
        }
        debug!("Embedding with {} at {}", client.model(), client.host());
        execute(&rt, pipeline.with_embedder(client))?
    } else {
        execute(&rt, pipeline)?
    };

    println!();
    println!(
        "{} {} documents into {} chunks",
        "Indexed:".green().bold(),
        report.processed,
        report.chunks
    );
    println!("  Cache hits: {}", report.cache_hits);
    match &report.published.model {
        Some(model) => println!(
            "  Embeddings: {} ({})",
            report.published.embedded,
            model.cyan()
        ),
        None => println!("  Embeddings: {}", "none".dimmed()),
    }
    println!("  Index: {}", report.published.index_path.display());
    print_classes(&report.class_counts);
    print_skipped(&report.skipped);

    Ok(())
}

fn execute<E: Embedder>(rt: &Runtime, pipeline: Pipeline<E>) -> Result<PipelineReport> {
    let pb = phase_spinner()?;
    let progress = track_progress(&pb);
    let result = rt.block_on(pipeline.run(Some(&progress)));
    pb.finish_and_clear();

    match result {
        Ok(report) => Ok(report),
        Err(IngestError::NothingToIndex(root)) => {
            anyhow::bail!(
                "No text could be extracted from {}. The existing index was left untouched.",
                root.display()
            )
        }
        Err(e) if e.is_destructive() => {
            eprintln!(
                "{} The previous index was deleted. Re-run 'litrev build' to recreate it.",
                "Warning:".yellow().bold()
            );
            Err(e).context("Index rebuild failed")
        }
        Err(e) => Err(e).context("Build failed"),
    }
}

//! Scan command - run extraction and chunking without publishing.

use super::{build_pipeline, get_paths, load_config, phase_spinner, track_progress};
use anyhow::{Context, Result};
use colored::Colorize;
use litrev_core::keys;
use litrev_ingest::{PreparedBuild, SkippedFile};
use std::collections::{BTreeMap, HashMap};
use tokio::runtime::Runtime;

pub fn run(dir: Option<&str>) -> Result<()> {
    let paths = get_paths()?;
    let config = load_config(&paths)?;
    let pipeline = build_pipeline(&config, &paths, dir)?;

    println!("{} {}", "Scanning:".cyan(), pipeline.root().display());

    let rt = Runtime::new().context("Failed to create async runtime")?;
    let pb = phase_spinner()?;
    let progress = track_progress(&pb);
    let prepared = rt.block_on(pipeline.prepare(Some(&progress)));
    pb.finish_and_clear();
    let prepared = prepared.context("Scan failed")?;

    if prepared.documents.is_empty() && prepared.skipped.is_empty() {
        println!("{}", "No supported files found.".yellow());
        return Ok(());
    }

    print_documents(&prepared);
    println!();
    println!(
        "{} {} documents, {} chunks ({} from cache)",
        "Scanned:".green().bold(),
        prepared.processed(),
        prepared.chunks.len(),
        prepared.cache_hits
    );
    print_classes(&prepared.class_counts());
    print_skipped(&prepared.skipped);
    println!();
    println!("{}", "Scan only - the index was not modified.".cyan());

    Ok(())
}

fn print_documents(prepared: &PreparedBuild) {
    let mut chunks_per_source: HashMap<&str, usize> = HashMap::new();
    for chunk in &prepared.chunks {
        if let Some(source) = chunk.source() {
            *chunks_per_source.entry(source).or_insert(0) += 1;
        }
    }

    println!();
    for doc in &prepared.documents {
        let source = doc.source.to_string_lossy();
        let name = doc
            .metadata
            .get(keys::RELATIVE_PATH)
            .and_then(|v| v.as_str())
            .unwrap_or(&*source);
        let class = doc.document_class().map(|c| c.as_str()).unwrap_or("unknown");
        println!(
            "  {} {} {}",
            name.white(),
            format!("[{}]", class).dimmed(),
            format!(
                "{} chunks",
                chunks_per_source.get(&*source).copied().unwrap_or(0)
            )
            .dimmed()
        );
    }
}

/// Print the document count per classification.
pub fn print_classes(counts: &BTreeMap<String, usize>) {
    if counts.is_empty() {
        return;
    }
    println!();
    println!("{}", "By type".white().bold());
    for (class, count) in counts {
        println!("  {}: {}", class, count);
    }
}

/// Print every skipped file with the reason it was skipped.
pub fn print_skipped(skipped: &[SkippedFile]) {
    if skipped.is_empty() {
        return;
    }
    println!();
    println!("{} {} files", "Skipped:".yellow().bold(), skipped.len());
    for file in skipped {
        println!("  {} {}", file.path.display(), file.reason.dimmed());
    }
}

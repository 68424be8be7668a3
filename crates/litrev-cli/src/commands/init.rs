//! Create the config file and data directories.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use litrev_config::Config;

pub fn run() -> Result<()> {
    let paths = get_paths()?;

    if paths.is_initialized() {
        println!("{} Already set up.", "Note:".yellow().bold());
        println!("  Config file: {}", paths.config_file.display());
        println!("  Text cache:  {}", paths.cache_dir.display());
        println!("  Index:       {}", paths.index_file.display());
        return Ok(());
    }

    paths
        .ensure_dirs()
        .with_context(|| format!("Cannot create {}", paths.data_dir.display()))?;
    Config::create_default_file(&paths.config_file)
        .with_context(|| format!("Cannot write {}", paths.config_file.display()))?;

    println!("{}", "Litrev is ready.".green().bold());
    println!("  {} {}", "config".dimmed(), paths.config_file.display());
    println!("  {} {}", "cache ".dimmed(), paths.cache_dir.display());
    println!("  {} {}", "index ".dimmed(), paths.index_file.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Point it at your papers: {}",
        "litrev config set ingest.source_dir ~/papers".cyan()
    );
    println!("  2. Preview what will be indexed: {}", "litrev scan".cyan());
    println!("  3. Build the index: {}", "litrev build".cyan());

    Ok(())
}

//! Configuration commands.

use super::{get_paths, load_config};
use anyhow::{Context, Result};
use colored::Colorize;
use litrev_config::Config;

pub fn show() -> Result<()> {
    let paths = get_paths()?;

    if !paths.config_file.exists() {
        anyhow::bail!("Config file not found. Run 'litrev init' first.");
    }

    let contents = std::fs::read_to_string(&paths.config_file)
        .context("Failed to read config file")?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("{}", contents);

    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let paths = get_paths()?;
    let mut config = load_config(&paths)?;

    apply(&mut config, key, value)?;

    config
        .save_to(&paths.config_file)
        .context("Failed to save config")?;

    println!("{} Set {} = {}", "✓".green(), key.cyan(), value);

    Ok(())
}

/// Assign `value` to the dotted `key`, parsing it for the field's type.
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "data_dir"] => config.general.data_dir = Some(value.to_string()),
        ["ingest", "source_dir"] => config.ingest.source_dir = value.to_string(),
        ["ingest", "cache_dir"] => config.ingest.cache_dir = Some(value.to_string()),
        ["ingest", "ignore_patterns"] => {
            config.ingest.ignore_patterns = value
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
        ["ingest", "max_workers"] => {
            config.ingest.max_workers = value.parse().context("Invalid max_workers value")?;
        }
        ["chunking", "chunk_size"] => {
            config.chunking.chunk_size = value.parse().context("Invalid chunk_size value")?;
        }
        ["chunking", "chunk_overlap"] => {
            config.chunking.chunk_overlap =
                value.parse().context("Invalid chunk_overlap value")?;
        }
        ["index", "path"] => config.index.path = Some(value.to_string()),
        ["index", "embed"] => {
            config.index.embed = value.parse().context("Invalid boolean value")?;
        }
        ["index", "batch_size"] => {
            config.index.batch_size = value.parse().context("Invalid batch_size value")?;
        }
        ["ollama", "host"] => config.ollama.host = value.to_string(),
        ["ollama", "embedding_model"] => config.ollama.embedding_model = value.to_string(),
        ["ollama", "timeout_seconds"] => {
            config.ollama.timeout_seconds = value.parse().context("Invalid timeout value")?;
        }
        _ => {
            anyhow::bail!("Unknown config key: {}", key);
        }
    }

    config.validate().context("Rejected configuration value")?;
    Ok(())
}

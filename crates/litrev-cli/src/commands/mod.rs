//! CLI command implementations.

pub mod build;
pub mod cache;
pub mod config;
pub mod init;
pub mod scan;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use litrev_config::{expand_home, AppPaths, Config};
use litrev_db::Database;
use litrev_ingest::{Pipeline, ProgressEvent};
use std::time::Duration;

/// Get the application paths.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_config(paths: &AppPaths) -> Result<Config> {
    Config::load_from(&paths.config_file).with_context(|| {
        format!(
            "Failed to load config from {}",
            paths.config_file.display()
        )
    })
}

/// Build a pipeline, scanning `dir` instead of the configured source directory when given.
pub fn build_pipeline(config: &Config, paths: &AppPaths, dir: Option<&str>) -> Result<Pipeline> {
    let pipeline =
        Pipeline::from_config(config, paths).context("Failed to set up the pipeline")?;
    Ok(match dir {
        Some(dir) => pipeline.with_root(expand_home(dir)),
        None => pipeline,
    })
}

/// Open the persisted index, failing if no build has run yet.
pub fn get_index(config: &Config, paths: &AppPaths) -> Result<Database> {
    let index_path = config.index_path(paths);
    if !index_path.exists() {
        anyhow::bail!(
            "No index found at {}. Run 'litrev build' first.",
            index_path.display()
        );
    }
    Database::open(&index_path).context("Failed to open index")
}

/// Spinner showing the current phase and how many items it has handled.
pub fn phase_spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {prefix:>8.cyan} {pos:>5} {wide_msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Progress callback that drives `pb`, restarting the count at each phase.
pub fn track_progress(pb: &ProgressBar) -> impl Fn(ProgressEvent<'_>) + Send + Sync + '_ {
    move |event| {
        let phase = event.phase.as_str();
        if pb.prefix() != phase {
            pb.set_prefix(phase);
            pb.set_position(0);
        }
        if let Some(name) = event.path.and_then(|p| p.file_name()) {
            pb.set_message(name.to_string_lossy().into_owned());
        }
        pb.inc(1);
    }
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Truncate a string to at most `max_chars` characters.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }
}

//! Where the config file, text cache and index live.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Platform locations for every file litrev owns.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub cache_dir: PathBuf,
    pub index_file: PathBuf,
}

impl AppPaths {
    /// Resolve the platform directories; `None` when there is no home directory.
    pub fn new() -> Option<Self> {
        let dirs = ProjectDirs::from("com", "litrev", "litrev")?;
        Some(Self::with_dirs(
            dirs.config_dir().to_path_buf(),
            dirs.data_dir().to_path_buf(),
        ))
    }

    /// Create paths rooted at explicit config and data directories.
    pub fn with_dirs(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join("config.toml"),
            cache_dir: data_dir.join("document_cache"),
            index_file: data_dir.join("index.db"),
            config_dir,
            data_dir,
        }
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        [&self.config_dir, &self.data_dir, &self.cache_dir]
            .into_iter()
            .try_for_each(std::fs::create_dir_all)
    }

    /// `litrev init` has written a config file.
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists()
    }
}

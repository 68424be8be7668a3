//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Smallest chunk size that still keeps a `--- Page N ---` marker in one piece.
pub const MIN_CHUNK_SIZE: usize = 32;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&paths.config_file)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default_config_string())?;
        Ok(())
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# Litrev Configuration
# Literature-review document index

[general]
# Data directory for the text cache and the index
# data_dir = "~/.local/share/litrev"

[ingest]
# Directory scanned for .pdf, .docx and .doc files
source_dir = "documents"

# Extracted-text cache (defaults to <data_dir>/document_cache)
# cache_dir = "~/.local/share/litrev/document_cache"

# File patterns to ignore
ignore_patterns = [
    "*.tmp",
    "~$*",
    ".DS_Store",
]

# Extraction workers (0 = one per CPU)
max_workers = 0

[chunking]
chunk_size = 1000              # Characters per chunk
chunk_overlap = 200            # Characters shared with the previous chunk

[index]
# Index location (defaults to <data_dir>/index.db); rebuilt from scratch on every build
# path = "~/.local/share/litrev/index.db"

# Compute embeddings while publishing
embed = true

# Chunks per embedding request batch
batch_size = 16

[ollama]
# Ollama server address
host = "http://localhost:11434"

# Model for generating embeddings
embedding_model = "nomic-embed-text"

# Request timeout in seconds
timeout_seconds = 120
"#
        .to_string()
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> ConfigResult<()> {
        let chunking = &self.chunking;
        if chunking.chunk_size <= MIN_CHUNK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "chunking.chunk_size must be greater than {}, got {}",
                MIN_CHUNK_SIZE, chunking.chunk_size
            )));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunking.chunk_overlap, chunking.chunk_size
            )));
        }
        if self.index.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "index.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Data directory, honouring the `general.data_dir` override.
    pub fn data_dir(&self, paths: &AppPaths) -> PathBuf {
        self.general
            .data_dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| paths.data_dir.clone())
    }

    /// Directory holding cached extracted text.
    pub fn cache_dir(&self, paths: &AppPaths) -> PathBuf {
        match self.ingest.cache_dir.as_deref() {
            Some(dir) => expand_home(dir),
            None => self.data_dir(paths).join("document_cache"),
        }
    }

    /// Location of the persisted index.
    pub fn index_path(&self, paths: &AppPaths) -> PathBuf {
        match self.index.path.as_deref() {
            Some(path) => expand_home(path),
            None => self.data_dir(paths).join("index.db"),
        }
    }

    /// Root directory scanned for documents.
    pub fn source_dir(&self) -> PathBuf {
        expand_home(&self.ingest.source_dir)
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(base) = directories::BaseDirs::new() {
            return base.home_dir().join(rest.trim_start_matches(['/', '\\']));
        }
    }
    PathBuf::from(path)
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub data_dir: Option<String>,
}

/// Document discovery and extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub source_dir: String,
    pub cache_dir: Option<String>,
    pub ignore_patterns: Vec<String>,
    pub max_workers: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_dir: "documents".to_string(),
            cache_dir: None,
            ignore_patterns: vec![
                "*.tmp".to_string(),
                "~$*".to_string(),
                ".DS_Store".to_string(),
            ],
            max_workers: 0,
        }
    }
}

impl IngestConfig {
    /// Worker count, resolving 0 to the machine's available parallelism.
    pub fn effective_workers(&self) -> usize {
        if self.max_workers > 0 {
            return self.max_workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Text chunking settings, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Persisted index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub path: Option<String>,
    pub embed: bool,
    pub batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: None,
            embed: true,
            batch_size: 16,
        }
    }
}

/// Ollama embedding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub embedding_model: String,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            timeout_seconds: 120,
        }
    }
}

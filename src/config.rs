use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::memory::{LogOptions, LogPaths};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MnemosConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub log_file: String,
    pub index_file: String,
    pub vector_file: String,
    pub read_workers: usize,
    pub sync_writes: bool,
    pub repair_on_open: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `http` (Ollama-compatible `/api/embed`) or `hash` (offline, deterministic).
    pub provider: String,
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub hash_dim: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub max_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_mnemos_dir().to_string_lossy().into_owned(),
            log_file: "memory.log".into(),
            index_file: "memory.idx".into(),
            vector_file: "vectors.jsonl".into(),
            read_workers: 4,
            sync_writes: true,
            repair_on_open: true,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "http".into(),
            url: "http://localhost:11434".into(),
            model: "embeddinggemma".into(),
            timeout_secs: 60,
            hash_dim: 64,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 6,
            max_chars: 8000,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1200,
            chunk_overlap: 200,
        }
    }
}

/// Returns `~/.mnemos/`, or `./.mnemos/` when there is no home directory.
pub fn default_mnemos_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mnemos")
}

/// Returns the default config file path: `~/.mnemos/config.toml`
pub fn default_config_path() -> PathBuf {
    default_mnemos_dir().join("config.toml")
}

impl MnemosConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MnemosConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply MNEMOS_DATA_DIR, MNEMOS_EMBED_URL, MNEMOS_EMBED_MODEL, MNEMOS_LOG_LEVEL.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("MNEMOS_DATA_DIR") {
            self.storage.data_dir = val;
        }
        if let Some(val) = lookup("MNEMOS_EMBED_URL") {
            self.embedding.url = val;
        }
        if let Some(val) = lookup("MNEMOS_EMBED_MODEL") {
            self.embedding.model = val;
        }
        if let Some(val) = lookup("MNEMOS_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the data directory, expanding `~` if needed.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }

    pub fn log_paths(&self) -> LogPaths {
        let dir = self.resolved_data_dir();
        LogPaths {
            log: dir.join(&self.storage.log_file),
            index: dir.join(&self.storage.index_file),
        }
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            read_workers: self.storage.read_workers,
            sync_writes: self.storage.sync_writes,
            repair_on_open: self.storage.repair_on_open,
        }
    }

    pub fn vector_path(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.storage.vector_file)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

//! On-disk configuration for the `faq` binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use faq_embeddings::EmbeddingConfig;
use faq_retrieval::RetrievalConfig;
use faq_store::StoreConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// File name looked up in the default data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Failed-search log kept next to the database.
pub const FEEDBACK_FILE: &str = "failed_searches.jsonl";

/// Everything the binary needs, loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqConfig {
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub retrieval: RetrievalConfig,
}

impl Default for FaqConfig {
    fn default() -> Self {
        Self::with_data_dir(default_data_dir())
    }
}

impl FaqConfig {
    /// Defaults with every file kept under `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::new(data_dir.join(FEEDBACK_FILE)),
            store: StoreConfig::default()
                .with_files_root(data_dir.clone())
                .with_data_dir(data_dir),
        }
    }

    /// Load `path` if given (it must exist), otherwise the default config
    /// file if present, otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = default_data_dir().join(CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    debug!("No config at {}, using defaults", default_path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: FaqConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        let explicit: ExplicitPaths = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.follow_data_dir(&explicit);
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Paths the file leaves unset live under `store.data_dir`.
    fn follow_data_dir(&mut self, explicit: &ExplicitPaths) {
        let data_dir = &self.store.data_dir;
        if explicit.retrieval.feedback_file.is_none() {
            self.retrieval.feedback_file = data_dir.join(FEEDBACK_FILE);
        }
        if explicit.store.files_root.is_none() {
            self.store.files_root = data_dir.clone();
        }
    }
}

/// The data-dir-relative paths a config file sets explicitly.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExplicitPaths {
    store: ExplicitStorePaths,
    retrieval: ExplicitRetrievalPaths,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExplicitStorePaths {
    files_root: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExplicitRetrievalPaths {
    feedback_file: Option<PathBuf>,
}

/// `<platform data dir>/faq`, or `./faq` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("faq")
}

//! Configuration for the entry store.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Where the store keeps its files and how it waits on locks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base directory for the database and the tag catalog.
    pub data_dir: PathBuf,

    /// Database file name, relative to `data_dir`.
    pub db_file: String,

    /// Tag catalog file name, relative to `data_dir`.
    pub tags_file: String,

    /// Root that relative image paths such as `./images/ED/x.jpg` resolve
    /// against when files are removed on delete.
    pub files_root: PathBuf,

    /// Lock/busy retry behaviour.
    pub retry: RetryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            db_file: "faq.db".to_string(),
            tags_file: "tags_config.json".to_string(),
            files_root: PathBuf::from("."),
            retry: RetryPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Set the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the files root.
    pub fn with_files_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.files_root = dir.into();
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Full path of the database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    /// Full path of the tag catalog.
    pub fn tags_path(&self) -> PathBuf {
        self.data_dir.join(&self.tags_file)
    }
}

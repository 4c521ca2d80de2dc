//! Failed-search log.
//!
//! Queries that produced no admitted result are appended as JSON lines so
//! admins can see which questions the knowledge base is missing.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;

/// One logged search that found nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedSearch {
    pub timestamp: DateTime<Utc>,
    pub query: String,
}

impl FailedSearch {
    pub fn now(query: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            query: query.into(),
        }
    }
}

/// Append-only JSON-lines log of failed searches.
pub struct FeedbackLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `query` with the current time.
    pub async fn record(&self, query: &str) -> Result<()> {
        self.append(&FailedSearch::now(query)).await
    }

    /// Append a prepared record.
    pub async fn append(&self, entry: &FailedSearch) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("Logged failed search: {}", entry.query);
        Ok(())
    }

    /// Every record in file order. A missing file reads as empty; malformed
    /// lines are skipped.
    pub async fn read_all(&self) -> Result<Vec<FailedSearch>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<FailedSearch>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping malformed line {} in {}: {e}",
                    number + 1,
                    self.path.display()
                ),
            }
        }
        Ok(records)
    }

    /// Drop every record.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, b"").await?;
        info!("Cleared failed-search log {}", self.path.display());
        Ok(())
    }
}

//! Embedding cache for memoised provider calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::Embedding;

/// Cache entry for an embedding.
#[derive(Debug, Clone)]
struct CacheEntry {
    embedding: Embedding,

    /// Insertion sequence, used to find the oldest entry on eviction.
    seq: u64,
}

/// Process-lifetime cache keyed on the exact input text.
///
/// Keys are the text itself rather than a hash of it, so two different
/// texts can never share a vector. Readers proceed concurrently; inserts of
/// different keys only contend on the write lock. Writing the same key twice
/// stores the same vector twice, which is harmless.
#[derive(Clone)]
pub struct EmbeddingCache {
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,

    next_seq: Arc<AtomicU64>,

    /// Maximum number of entries; `None` keeps everything.
    max_entries: Option<usize>,
}

impl EmbeddingCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            next_seq: Arc::new(AtomicU64::new(0)),
            max_entries: None,
        }
    }

    /// Create a cache that evicts its oldest entry past `max_entries`.
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries.max(1)),
            ..Self::new()
        }
    }

    /// Get an embedding from the cache.
    pub async fn get(&self, text: &str) -> Option<Embedding> {
        let cache = self.cache.read().await;
        cache.get(text).map(|e| e.embedding.clone())
    }

    /// Put an embedding in the cache.
    pub async fn put(&self, text: &str, embedding: Embedding) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut cache = self.cache.write().await;

        if let Some(max) = self.max_entries {
            if cache.len() >= max && !cache.contains_key(text) {
                if let Some(oldest_key) = cache
                    .iter()
                    .min_by_key(|(_, v)| v.seq)
                    .map(|(k, _)| k.clone())
                {
                    cache.remove(&oldest_key);
                }
            }
        }

        cache.insert(text.to_string(), CacheEntry { embedding, seq });
        debug!("Cached embedding ({} entries)", cache.len());
    }

    /// Check if an embedding is cached.
    pub async fn contains(&self, text: &str) -> bool {
        self.cache.read().await.contains_key(text)
    }

    /// Clear the entire cache.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
        info!("Cleared embedding cache");
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.read().await.len(),
            max_entries: self.max_entries,
        }
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the embedding cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in cache.
    pub entries: usize,

    /// Maximum cache size, if bounded.
    pub max_entries: Option<usize>,
}

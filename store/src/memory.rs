//! In-process vector collection.
//!
//! Keeps records in insertion order behind an async lock. Useful for tests
//! and for throwaway runs where nothing needs to survive a restart.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::Result;
use crate::vector::{QueryHit, StoredRecord, VectorRecord, VectorStore, rank_candidates};

/// Vector collection held entirely in memory.
#[derive(Default)]
pub struct MemoryVectorStore {
    records: RwLock<Vec<VectorRecord>>,
}

impl MemoryVectorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, record: VectorRecord) -> Result<()> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn get(&self, ids: &[String]) -> Result<Vec<StoredRecord>> {
        let records = self.records.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| records.iter().find(|r| &r.id == id))
            .map(VectorRecord::to_stored)
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<StoredRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().map(VectorRecord::to_stored).collect())
    }

    async fn ids(&self) -> Result<Vec<String>> {
        let records = self.records.read().await;
        Ok(records.iter().map(|r| r.id.clone()).collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !ids.contains(&r.id));
        info!("Deleted {} records from memory store", before - records.len());
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize, tag: Option<&str>) -> Result<Vec<QueryHit>> {
        let records = self.records.read().await;
        let candidates = records
            .iter()
            .filter(|r| tag.is_none_or(|tag| r.metadata.tag == tag))
            .map(|r| (r.to_stored(), r.embedding.clone()));

        let hits = rank_candidates(embedding, candidates, k);
        debug!("Memory query returned {} hits", hits.len());
        Ok(hits)
    }
}

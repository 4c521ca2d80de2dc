//! Vector collection interface.
//!
//! The entry store only needs upsert, fetch, delete and a nearest-neighbour
//! query with an optional equality filter on `tag`. Backends implement
//! [`VectorStore`]; ranking is shared so every backend orders hits the same
//! way.

use async_trait::async_trait;
use faq_embeddings::{Embedding, cosine_distance};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entry::EntryMetadata;
use crate::error::Result;

/// Everything written for one id in a single atomic upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Embedding,
    /// The exact text that was embedded.
    pub document: String,
    pub metadata: EntryMetadata,
}

impl VectorRecord {
    /// Read-side view without the vector.
    pub fn to_stored(&self) -> StoredRecord {
        StoredRecord {
            id: self.id.clone(),
            document: self.document.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// A record as returned by reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub document: String,
    pub metadata: EntryMetadata,
}

/// One nearest-neighbour result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub record: StoredRecord,
    /// Cosine distance to the query; lower is more similar.
    pub distance: f64,
}

/// A persistent or in-memory vector collection.
///
/// Lock/busy conditions must surface as
/// [`StoreError::Locked`](crate::StoreError::Locked) so callers can retry.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Insert or replace id, vector, document and metadata together.
    async fn upsert(&self, record: VectorRecord) -> Result<()>;

    /// Fetch the given ids; unknown ids are skipped.
    async fn get(&self, ids: &[String]) -> Result<Vec<StoredRecord>>;

    /// Fetch every record in native order.
    async fn get_all(&self) -> Result<Vec<StoredRecord>>;

    /// Every id in native order.
    async fn ids(&self) -> Result<Vec<String>>;

    /// Remove the given ids; unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Up to `k` records closest to `embedding`, restricted to `tag` before
    /// ranking when one is given.
    async fn query(&self, embedding: &[f32], k: usize, tag: Option<&str>) -> Result<Vec<QueryHit>>;
}

/// Rank already-filtered candidates by cosine distance.
///
/// The sort is stable, so equal distances keep the candidates' native order.
/// Candidates whose dimension differs from the query are skipped.
pub fn rank_candidates<I>(query: &[f32], candidates: I, k: usize) -> Vec<QueryHit>
where
    I: IntoIterator<Item = (StoredRecord, Embedding)>,
{
    let mut scored: Vec<(OrderedFloat<f64>, StoredRecord)> = candidates
        .into_iter()
        .filter_map(|(record, embedding)| match cosine_distance(query, &embedding) {
            Ok(distance) => Some((OrderedFloat(distance), record)),
            Err(e) => {
                debug!("Skipping {} during ranking: {e}", record.id);
                None
            }
        })
        .collect();

    scored.sort_by_key(|(distance, _)| *distance);

    scored
        .into_iter()
        .take(k)
        .map(|(distance, record)| QueryHit {
            record,
            distance: distance.0,
        })
        .collect()
}

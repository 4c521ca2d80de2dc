//! The entry store adapter.
//!
//! Sits between the engines and the vector collection. Every write embeds the
//! entry first and then commits id, vector, document and metadata in one
//! backend call; every backend call is wrapped in [`retry_on_busy`].

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use faq_embeddings::{Embedding, EmbeddingGateway};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::entry::{Entry, EntryDraft, EntryId, EntryMetadata, TagFilter, next_numeric_id};
use crate::error::{Result, StoreError};
use crate::retry::{RetryPolicy, retry_on_busy};
use crate::sqlite::SqliteVectorStore;
use crate::tags::{TagCatalog, default_catalog};
use crate::vector::{StoredRecord, VectorRecord, VectorStore};

/// Typed access to knowledge entries.
pub struct EntryStore {
    vectors: Arc<dyn VectorStore>,
    gateway: Arc<EmbeddingGateway>,
    catalog: Arc<TagCatalog>,
    retry: RetryPolicy,
    files_root: PathBuf,
    /// Held from "compute next id" to "commit" for auto-assigned writes.
    id_lock: Mutex<()>,
}

impl EntryStore {
    pub fn new(
        vectors: Arc<dyn VectorStore>,
        gateway: Arc<EmbeddingGateway>,
        catalog: Arc<TagCatalog>,
    ) -> Self {
        Self {
            vectors,
            gateway,
            catalog,
            retry: RetryPolicy::default(),
            files_root: PathBuf::from("."),
            id_lock: Mutex::new(()),
        }
    }

    /// Open the SQLite collection and tag catalog described by `config`.
    pub async fn open(config: &StoreConfig, gateway: Arc<EmbeddingGateway>) -> Result<Self> {
        let vectors = SqliteVectorStore::open(config.db_path())?;
        let catalog = TagCatalog::open(config.tags_path(), default_catalog()).await?;

        Ok(Self::new(Arc::new(vectors), gateway, Arc::new(catalog))
            .with_retry(config.retry)
            .with_files_root(config.files_root.clone()))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_files_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.files_root = root.into();
        self
    }

    pub fn catalog(&self) -> &Arc<TagCatalog> {
        &self.catalog
    }

    pub fn gateway(&self) -> &Arc<EmbeddingGateway> {
        &self.gateway
    }

    /// Create or replace an entry and return its id.
    ///
    /// Nothing is written when the draft is invalid or the embedding could
    /// not be produced.
    pub async fn upsert(&self, id: EntryId, draft: EntryDraft) -> Result<String> {
        draft.validate()?;

        let description = self.catalog.description_for(&draft.tag).await;
        let document = self.gateway.build_context(
            &draft.title,
            &draft.answer_text,
            &draft.keywords,
            &draft.tag,
            &description,
        );
        let embedding = self.gateway.embed_document(&document).await;
        if embedding.is_empty() {
            warn!("Refusing to write entry {:?} without an embedding", draft.title);
            return Err(StoreError::EmbeddingUnavailable);
        }

        let metadata = draft.into_metadata();
        match id {
            EntryId::Explicit(id) => self.commit(id, embedding, document, metadata).await,
            EntryId::AutoAssign => {
                let _guard = self.id_lock.lock().await;
                let id = self.next_id().await?;
                self.commit(id, embedding, document, metadata).await
            }
        }
    }

    async fn commit(
        &self,
        id: String,
        embedding: Embedding,
        document: String,
        metadata: EntryMetadata,
    ) -> Result<String> {
        let record = VectorRecord {
            id,
            embedding,
            document,
            metadata,
        };
        retry_on_busy(self.retry, "upsert", || self.vectors.upsert(record.clone())).await?;

        info!("Saved entry {} ({})", record.id, record.metadata.title);
        Ok(record.id)
    }

    /// Id that an auto-assigned write would receive right now.
    pub async fn next_id(&self) -> Result<String> {
        let ids = retry_on_busy(self.retry, "ids", || self.vectors.ids()).await?;
        Ok(next_numeric_id(ids.iter().map(String::as_str)))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Entry>> {
        Ok(self
            .get_record(id)
            .await?
            .map(|record| Entry::from_metadata(record.id, record.metadata)))
    }

    /// Entry plus the exact text it was embedded from.
    pub async fn get_record(&self, id: &str) -> Result<Option<StoredRecord>> {
        let ids = [id.to_string()];
        let records = retry_on_busy(self.retry, "get", || self.vectors.get(&ids)).await?;
        Ok(records.into_iter().next())
    }

    /// Remove an entry and, best-effort, its image files. Unknown ids are a
    /// no-op.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let Some(entry) = self.get_by_id(id).await? else {
            debug!("Delete of unknown entry {id} ignored");
            return Ok(());
        };

        for path in entry.image_paths.iter() {
            self.remove_image(path).await;
        }

        let ids = [entry.id];
        retry_on_busy(self.retry, "delete", || self.vectors.delete(&ids)).await?;
        info!("Deleted entry {id}");
        Ok(())
    }

    async fn remove_image(&self, path: &str) {
        let Some(full) = resolve_under(&self.files_root, path) else {
            warn!("Not removing image outside the files root: {path}");
            return;
        };
        match tokio::fs::remove_file(&full).await {
            Ok(()) => debug!("Removed image {}", full.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove image {}: {e}", full.display()),
        }
    }

    /// Every entry, newest numeric id first. Non-numeric ids sort as 0 and
    /// keep store order among themselves.
    pub async fn list_all_sorted(&self) -> Result<Vec<Entry>> {
        let records = retry_on_busy(self.retry, "get_all", || self.vectors.get_all()).await?;
        let mut entries: Vec<Entry> = records
            .into_iter()
            .map(|record| Entry::from_metadata(record.id, record.metadata))
            .collect();
        entries.sort_by_key(|entry| Reverse(entry.sort_key()));
        Ok(entries)
    }

    /// Distinct non-empty tags in use, sorted.
    pub async fn list_unique_tags(&self) -> Result<Vec<String>> {
        let records = retry_on_busy(self.retry, "get_all", || self.vectors.get_all()).await?;
        let tags: BTreeSet<String> = records
            .into_iter()
            .map(|record| record.metadata.tag)
            .filter(|tag| !tag.trim().is_empty())
            .collect();
        Ok(tags.into_iter().collect())
    }

    /// Up to `limit` entries closest to `embedding`, with their distances.
    pub async fn query_nearest(
        &self,
        embedding: &[f32],
        filter: &TagFilter,
        limit: usize,
    ) -> Result<Vec<(Entry, f64)>> {
        let tag = filter.as_tag();
        let hits = retry_on_busy(self.retry, "query", || {
            self.vectors.query(embedding, limit, tag)
        })
        .await?;

        debug!("query_nearest({filter}) returned {} hits", hits.len());
        Ok(hits
            .into_iter()
            .map(|hit| (Entry::from_metadata(hit.record.id, hit.record.metadata), hit.distance))
            .collect())
    }
}

/// Join a stored relative path onto `root`, refusing anything that would
/// escape it.
fn resolve_under(root: &Path, path: &str) -> Option<PathBuf> {
    let relative = Path::new(path);
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => resolved.push(part),
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ImagePaths;
    use crate::memory::MemoryVectorStore;
    use crate::vector::QueryHit;
    use async_trait::async_trait;
    use faq_embeddings::{EmbeddingError, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    /// Two-dimensional vector from the text; fails when it contains "offline".
    struct StubProvider;

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn default_model(&self) -> &str {
            "stub-1"
        }

        async fn embed(&self, request: EmbeddingRequest) -> faq_embeddings::Result<EmbeddingResponse> {
            if request.text.contains("offline") {
                return Err(EmbeddingError::ApiRequest("offline".to_string()));
            }
            let vowels = request.text.chars().filter(|c| "aeiou".contains(*c)).count();
            Ok(EmbeddingResponse {
                embedding: vec![1.0, vowels as f32 / 100.0],
                model: "stub-1".to_string(),
                dimension: 2,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    /// Memory store whose first `failures` upserts report a lock.
    struct FlakyStore {
        inner: MemoryVectorStore,
        failures: AtomicU32,
    }

    #[async_trait]
    impl VectorStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn upsert(&self, record: VectorRecord) -> Result<()> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::Locked("database is locked".to_string()));
            }
            self.inner.upsert(record).await
        }

        async fn get(&self, ids: &[String]) -> Result<Vec<StoredRecord>> {
            self.inner.get(ids).await
        }

        async fn get_all(&self) -> Result<Vec<StoredRecord>> {
            self.inner.get_all().await
        }

        async fn ids(&self) -> Result<Vec<String>> {
            self.inner.ids().await
        }

        async fn delete(&self, ids: &[String]) -> Result<()> {
            self.inner.delete(ids).await
        }

        async fn query(&self, embedding: &[f32], k: usize, tag: Option<&str>) -> Result<Vec<QueryHit>> {
            self.inner.query(embedding, k, tag).await
        }
    }

    async fn store_with(vectors: Arc<dyn VectorStore>, dir: &TempDir) -> EntryStore {
        let catalog = TagCatalog::open(dir.path().join("tags.json"), default_catalog())
            .await
            .unwrap();
        EntryStore::new(
            vectors,
            Arc::new(EmbeddingGateway::new(Arc::new(StubProvider))),
            Arc::new(catalog),
        )
        .with_retry(RetryPolicy::immediate(10))
        .with_files_root(dir.path())
    }

    async fn memory_store(dir: &TempDir) -> EntryStore {
        store_with(Arc::new(MemoryVectorStore::new()), dir).await
    }

    #[tokio::test]
    async fn test_auto_ids_count_up_from_one() {
        let dir = TempDir::new().unwrap();
        let store = memory_store(&dir).await;

        assert_eq!(store.next_id().await.unwrap(), "1");
        for expected in ["1", "2", "3"] {
            let id = store
                .upsert(EntryId::AutoAssign, EntryDraft::new("ED", "Title", "Answer"))
                .await
                .unwrap();
            assert_eq!(id, expected);
        }
    }

    #[tokio::test]
    async fn test_auto_id_skips_non_numeric() {
        let dir = TempDir::new().unwrap();
        let store = memory_store(&dir).await;

        for id in ["apple", "5", "3"] {
            store
                .upsert(EntryId::parse(id), EntryDraft::new("ED", id, "Answer"))
                .await
                .unwrap();
        }
        assert_eq!(store.next_id().await.unwrap(), "6");
    }

    #[tokio::test]
    async fn test_list_all_sorted_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = memory_store(&dir).await;

        for id in ["3", "10", "apple", "5"] {
            store
                .upsert(EntryId::parse(id), EntryDraft::new("ED", id, "Answer"))
                .await
                .unwrap();
        }

        let ids: Vec<_> = store
            .list_all_sorted()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["10", "5", "3", "apple"]);
    }

    #[tokio::test]
    async fn test_round_trip_and_replace() {
        let dir = TempDir::new().unwrap();
        let store = memory_store(&dir).await;

        let draft = EntryDraft::new("OPD", "Reset password", "Open settings [GAMBAR 1]")
            .with_keywords("lupa password")
            .with_images(ImagePaths::parse("./images/OPD/a.jpg"))
            .with_source_url("https://sop.example/1");
        store
            .upsert(EntryId::parse("7"), draft)
            .await
            .unwrap();

        let entry = store.get_by_id("7").await.unwrap().unwrap();
        assert_eq!(
            entry,
            Entry {
                id: "7".to_string(),
                tag: "OPD".to_string(),
                title: "Reset password".to_string(),
                answer_text: "Open settings [GAMBAR 1]".to_string(),
                keywords: "lupa password".to_string(),
                image_paths: ImagePaths::parse("./images/OPD/a.jpg"),
                source_url: Some("https://sop.example/1".to_string()),
            }
        );

        let record = store.get_record("7").await.unwrap().unwrap();
        assert!(record.document.starts_with("DOMAIN: OPD (Rawat Jalan, Poli, Dokter)\n"));
        assert!(!record.document.contains("GAMBAR"));

        store
            .upsert(EntryId::parse("7"), EntryDraft::new("IPD", "Changed", "New"))
            .await
            .unwrap();
        let replaced = store.get_by_id("7").await.unwrap().unwrap();
        assert_eq!(
            replaced,
            Entry::from_metadata("7", EntryDraft::new("IPD", "Changed", "New").into_metadata())
        );
        assert_eq!(store.list_all_sorted().await.unwrap(), vec![replaced]);
    }

    #[tokio::test]
    async fn test_auto_id_after_very_large_explicit_id() {
        let dir = TempDir::new().unwrap();
        let store = memory_store(&dir).await;

        store
            .upsert(EntryId::parse("18446744073709551615"), EntryDraft::new("ED", "Big", "Answer"))
            .await
            .unwrap();
        let id = store
            .upsert(EntryId::AutoAssign, EntryDraft::new("ED", "Next", "Answer"))
            .await
            .unwrap();

        assert_eq!(id, "18446744073709551616");
        assert_eq!(store.get_by_id(&id).await.unwrap().unwrap().title, "Next");
    }

    #[tokio::test]
    async fn test_invalid_or_unembeddable_drafts_are_not_written() {
        let dir = TempDir::new().unwrap();
        let store = memory_store(&dir).await;

        let err = store
            .upsert(EntryId::AutoAssign, EntryDraft::new("ED", "", "Answer"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = store
            .upsert(EntryId::AutoAssign, EntryDraft::new("ED", "Title", "offline"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::EmbeddingUnavailable));

        assert!(store.list_all_sorted().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_entry_and_images() {
        let dir = TempDir::new().unwrap();
        let store = memory_store(&dir).await;

        let images = dir.path().join("images/ED");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("a.jpg"), b"jpg").unwrap();

        store
            .upsert(
                EntryId::parse("1"),
                EntryDraft::new("ED", "Triage", "See [GAMBAR 1]").with_images(ImagePaths::parse(
                    "./images/ED/a.jpg;./images/ED/missing.jpg;../outside.jpg",
                )),
            )
            .await
            .unwrap();

        store.delete("1").await.unwrap();
        assert!(store.get_by_id("1").await.unwrap().is_none());
        assert!(!images.join("a.jpg").exists());

        store.delete("1").await.unwrap();
        store.delete("does-not-exist").await.unwrap();
    }

    #[tokio::test]
    async fn test_query_nearest_prefilters_by_tag() {
        let dir = TempDir::new().unwrap();
        let store = memory_store(&dir).await;

        for (id, tag) in [("1", "ED"), ("2", "OPD"), ("3", "OPD"), ("4", "IPD")] {
            store
                .upsert(EntryId::parse(id), EntryDraft::new(tag, "Title", "Answer"))
                .await
                .unwrap();
        }

        let hits = store
            .query_nearest(&[1.0, 0.0], &TagFilter::parse("OPD"), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|(entry, _)| entry.tag == "OPD"));

        let all = store
            .query_nearest(&[1.0, 0.0], &TagFilter::All, 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(store.list_unique_tags().await.unwrap(), vec!["ED", "IPD", "OPD"]);
    }

    #[tokio::test]
    async fn test_transient_locks_are_retried() {
        let dir = TempDir::new().unwrap();
        let store = store_with(
            Arc::new(FlakyStore {
                inner: MemoryVectorStore::new(),
                failures: AtomicU32::new(3),
            }),
            &dir,
        )
        .await;

        let id = store
            .upsert(EntryId::AutoAssign, EntryDraft::new("ED", "Title", "Answer"))
            .await
            .unwrap();
        assert_eq!(id, "1");
        assert!(store.get_by_id("1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_persistent_lock_reports_busy() {
        let dir = TempDir::new().unwrap();
        let store = store_with(
            Arc::new(FlakyStore {
                inner: MemoryVectorStore::new(),
                failures: AtomicU32::new(u32::MAX),
            }),
            &dir,
        )
        .await;

        let err = store
            .upsert(EntryId::AutoAssign, EntryDraft::new("ED", "Title", "Answer"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Busy { attempts: 10 }));
    }

    #[tokio::test]
    async fn test_concurrent_auto_ids_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(memory_store(&dir).await);

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let store = store.clone();
            tasks.spawn(async move {
                store
                    .upsert(
                        EntryId::AutoAssign,
                        EntryDraft::new("ED", format!("Title {i}"), "Answer"),
                    )
                    .await
                    .unwrap()
            });
        }

        let mut ids = Vec::new();
        while let Some(id) = tasks.join_next().await {
            ids.push(id.unwrap().parse::<u64>().unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_resolve_under_rejects_escape() {
        let root = Path::new("/srv/faq");
        assert_eq!(
            resolve_under(root, "./images/ED/a.jpg"),
            Some(PathBuf::from("/srv/faq/images/ED/a.jpg"))
        );
        assert_eq!(resolve_under(root, "../etc/passwd"), None);
        assert_eq!(resolve_under(root, "/etc/passwd"), None);
    }
}

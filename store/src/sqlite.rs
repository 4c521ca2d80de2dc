//! SQLite-backed vector collection.
//!
//! One row per entry: id, tag (indexed, used for the pre-filter), the
//! embedded document, JSON metadata and the vector as little-endian `f32`s.
//! Several processes may open the same file; contention surfaces as
//! [`StoreError::Locked`] because the connection's busy timeout is zero and
//! waiting is left to the retry wrapper.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use faq_embeddings::Embedding;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::entry::EntryMetadata;
use crate::error::{Result, StoreError};
use crate::vector::{QueryHit, StoredRecord, VectorRecord, VectorStore, rank_candidates};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    tag TEXT NOT NULL,
    document TEXT NOT NULL,
    metadata TEXT NOT NULL,
    embedding BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_entries_tag ON entries(tag);
";

/// Vector collection stored in a SQLite database.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("Opened {} with journal_mode={mode}", path.display());

        let store = Self::init(conn)?;
        info!("SQLite vector store ready at {}", path.display());
        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::ZERO)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Io(std::io::Error::other(format!("connection mutex poisoned: {e}"))))
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Embedding {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn stored_record(id: String, document: String, metadata: &str) -> Result<StoredRecord> {
    let metadata: EntryMetadata = serde_json::from_str(metadata)?;
    Ok(StoredRecord {
        id,
        document,
        metadata,
    })
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, record: VectorRecord) -> Result<()> {
        let metadata = serde_json::to_string(&record.metadata)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO entries (id, tag, document, metadata, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                tag = excluded.tag,
                document = excluded.document,
                metadata = excluded.metadata,
                embedding = excluded.embedding",
            params![
                record.id,
                record.metadata.tag,
                record.document,
                metadata,
                encode_embedding(&record.embedding),
            ],
        )?;
        debug!("Upserted {} into sqlite store", record.id);
        Ok(())
    }

    async fn get(&self, ids: &[String]) -> Result<Vec<StoredRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, document, metadata FROM entries WHERE id = ?1")?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            let row = stmt
                .query_row(params![id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                })
                .optional()?;
            if let Some((id, document, metadata)) = row {
                records.push(stored_record(id, document, &metadata)?);
            }
        }
        Ok(records)
    }

    async fn get_all(&self) -> Result<Vec<StoredRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, document, metadata FROM entries ORDER BY rowid")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, document, metadata)| stored_record(id, document, &metadata))
            .collect()
    }

    async fn ids(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM entries ORDER BY rowid")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM entries WHERE id = ?1")?;
            for id in ids {
                removed += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        info!("Deleted {removed} records from sqlite store");
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize, tag: Option<&str>) -> Result<Vec<QueryHit>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, document, metadata, embedding FROM entries
             WHERE ?1 IS NULL OR tag = ?1
             ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map(params![tag], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut candidates = Vec::with_capacity(rows.len());
        for (id, document, metadata, blob) in rows {
            candidates.push((stored_record(id, document, &metadata)?, decode_embedding(&blob)));
        }

        let hits = rank_candidates(embedding, candidates, k);
        debug!("SQLite query returned {} hits", hits.len());
        Ok(hits)
    }
}

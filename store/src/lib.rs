//! # Store
//!
//! Persistence for the FAQ knowledge base.
//!
//! ## Features
//!
//! - **Entry Store**: Typed CRUD over knowledge entries with auto-assigned ids
//! - **Vector Collections**: SQLite on disk, or in memory for tests
//! - **Lock Tolerance**: Busy/locked backends are retried with jittered waits
//! - **Tag Catalog**: Badge colours and descriptions in a JSON file
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          EntryStore                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EntryDraft ──► EmbeddingGateway ──► VectorRecord               │
//! │                                          │                      │
//! │                                  retry_on_busy                  │
//! │                                          ▼                      │
//! │                 dyn VectorStore (SqliteVectorStore | Memory)    │
//! │                                                                 │
//! │  TagCatalog (tags_config.json) ──► tag description in context   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod memory;
pub mod retry;
pub mod sqlite;
pub mod store;
pub mod tags;
pub mod vector;

pub use config::StoreConfig;
pub use entry::{
    ALL_TAGS_LABEL, Entry, EntryDraft, EntryId, EntryMetadata, ImagePaths, NO_IMAGES, TagFilter,
    next_numeric_id,
};
pub use error::{Result, StoreError};
pub use memory::MemoryVectorStore;
pub use retry::{RetryPolicy, retry_on_busy};
pub use sqlite::SqliteVectorStore;
pub use store::EntryStore;
pub use tags::{DEFAULT_TAG_COLOR, PALETTE, PaletteColor, TagCatalog, TagInfo, default_catalog};
pub use vector::{QueryHit, StoredRecord, VectorRecord, VectorStore, rank_candidates};

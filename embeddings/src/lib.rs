//! # Embeddings
//!
//! Embedding gateway for the FAQ knowledge base.
//!
//! ## Features
//!
//! - **Context Building**: Deterministic embedding input text for an entry
//! - **Providers**: Gemini `embedContent` over HTTP, behind a trait
//! - **Memoisation**: Each distinct text is sent to the provider once per process
//! - **Failure Absorption**: Provider errors become an empty vector, never a panic
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Embedding Gateway                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingContext ──► embed_document ──► document EmbeddingCache │
//! │  user query ───────► embed_query    ──► query EmbeddingCache     │
//! │                            │                                    │
//! │                            ▼                                    │
//! │                   dyn EmbeddingProvider (Gemini)                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod provider;
pub mod similarity;

pub use cache::{CacheStats, EmbeddingCache};
pub use config::{EmbeddingConfig, EmbeddingProviderType};
pub use context::{EmbeddingContext, clean_answer_text};
pub use error::{EmbeddingError, Result};
pub use gateway::EmbeddingGateway;
pub use provider::{
    EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, GeminiProvider, TaskType,
};
pub use similarity::{cosine_distance, cosine_similarity};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Output dimension requested from the provider when none is configured.
pub const DEFAULT_DIMENSION: usize = 768;

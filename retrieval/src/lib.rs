//! # Retrieval
//!
//! Search and browsing over the FAQ knowledge base.
//!
//! - **Search**: embeds the query, pre-filters by tag in the store, scores
//!   candidates on a 0..=100 scale and keeps those above the admission
//!   threshold
//! - **Bot answers**: the single best hit, hedged when the score is low, with
//!   `[GAMBAR n]` placeholders turned into image attachments
//! - **Browse**: newest-first listing with clamped pagination
//! - **Feedback**: every search that found nothing usable is logged
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        RetrievalEngine                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  SearchRequest ──► embed_query ──► EntryStore::query_nearest    │
//! │                                          │                      │
//! │                          score, admit, sort, truncate           │
//! │                                          │                      │
//! │              SearchOutcome ◄─────────────┴──► FeedbackLog       │
//! │                    │                                            │
//! │        best_answer ──► compose_reply ──► BotReply               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  BrowseEngine ──► list_all_sorted ──► paginate ──► BrowsePage   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use faq_retrieval::{RetrievalConfig, RetrievalEngine, SearchRequest};
//!
//! let engine = RetrievalEngine::new(store, &RetrievalConfig::default());
//! let request = SearchRequest::interactive(engine.limits(), "reset password", TagFilter::All);
//! for hit in engine.search(&request).await?.hits() {
//!     println!("{} ({}%)", hit.entry.title, hit.display_score());
//! }
//! ```

pub mod browse;
pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod placeholder;
pub mod reply;

pub use browse::{BrowseEngine, BrowsePage, Page, paginate};
pub use config::{RelevanceConfig, RetrievalConfig, SearchLimits};
pub use engine::{
    BotAnswer, Certainty, RetrievalEngine, ScoreBand, ScoredEntry, SearchOutcome, SearchRequest,
    relevance_score,
};
pub use error::{Result, RetrievalError};
pub use feedback::{FailedSearch, FeedbackLog};
pub use placeholder::{ResolvedAnswer, Segment, image_url, resolve_placeholders};
pub use reply::{BOT_MENTION, BotReply, ReplyImage, clean_chat_query, compose_reply};

// Re-export from dependencies for convenience
pub use faq_store::{Entry, EntryStore, TagFilter};

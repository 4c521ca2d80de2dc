//! Semantic search over knowledge entries.

use std::sync::Arc;

use faq_store::{Entry, EntryStore, TagFilter};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{RelevanceConfig, RetrievalConfig, SearchLimits};
use crate::error::Result;
use crate::feedback::FeedbackLog;

/// Relevance on a 0..=100 scale from a cosine distance.
pub fn relevance_score(distance: f64) -> f64 {
    ((1.0 - distance) * 100.0).max(0.0)
}

/// Badge tier for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score > 80.0 {
            ScoreBand::High
        } else if score > 50.0 {
            ScoreBand::Medium
        } else {
            ScoreBand::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreBand::High => "high",
            ScoreBand::Medium => "medium",
            ScoreBand::Low => "low",
        }
    }
}

/// An entry that cleared the admission threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEntry {
    pub entry: Entry,
    pub distance: f64,
    pub score: f64,
    pub band: ScoreBand,
}

impl ScoredEntry {
    pub fn new(entry: Entry, distance: f64) -> Self {
        let score = relevance_score(distance);
        Self {
            entry,
            distance,
            score,
            band: ScoreBand::from_score(score),
        }
    }

    /// Whole-number score as shown on result badges.
    pub fn display_score(&self) -> u32 {
        self.score as u32
    }
}

/// What to search for and how many results to consider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub tag: TagFilter,
    /// Candidates fetched from the store before scoring.
    pub fetch_limit: usize,
    /// Cap on returned results after scoring; `None` returns all admitted.
    pub display_limit: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, tag: TagFilter, fetch_limit: usize) -> Self {
        Self {
            query: query.into(),
            tag,
            fetch_limit,
            display_limit: None,
        }
    }

    pub fn with_display_limit(mut self, limit: usize) -> Self {
        self.display_limit = Some(limit);
        self
    }

    /// Full result list, paginated by the caller.
    pub fn interactive(limits: &SearchLimits, query: impl Into<String>, tag: TagFilter) -> Self {
        Self::new(query, tag, limits.interactive_fetch)
    }

    /// Short list for narrow layouts.
    pub fn compact(limits: &SearchLimits, query: impl Into<String>, tag: TagFilter) -> Self {
        Self::new(query, tag, limits.compact_fetch).with_display_limit(limits.compact_display)
    }

    /// At most `n` results.
    pub fn top(limits: &SearchLimits, query: impl Into<String>, tag: TagFilter, n: usize) -> Self {
        Self::new(query, tag, limits.top_fetch).with_display_limit(n)
    }

    /// Single best answer across every tag.
    pub fn bot(limits: &SearchLimits, query: impl Into<String>) -> Self {
        Self::new(query, TagFilter::All, limits.bot_fetch).with_display_limit(1)
    }
}

/// Result of a search. Only store failures are errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The query was blank; nothing was embedded.
    EmptyQuery,
    /// The embedding provider failed; treated as "no results".
    EmbeddingUnavailable,
    /// The store returned no candidates at all.
    NoCandidates,
    /// Candidates existed but none scored above the admission threshold.
    NoRelevantResult,
    /// Admitted results, best first.
    Found(Vec<ScoredEntry>),
}

impl SearchOutcome {
    /// Admitted results, empty for every other outcome.
    pub fn hits(&self) -> &[ScoredEntry] {
        match self {
            SearchOutcome::Found(hits) => hits,
            _ => &[],
        }
    }

    pub fn into_hits(self) -> Vec<ScoredEntry> {
        match self {
            SearchOutcome::Found(hits) => hits,
            _ => Vec::new(),
        }
    }
}

/// How sure the bot is about its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Certainty {
    Confident,
    Hedged,
}

/// The single answer a chat bot should give.
#[derive(Debug, Clone, PartialEq)]
pub enum BotAnswer {
    Answer {
        entry: Entry,
        score: f64,
        certainty: Certainty,
    },
    NotFound {
        query: String,
    },
    EmptyQuery,
}

/// Scores store candidates against a query and logs failed searches.
pub struct RetrievalEngine {
    store: Arc<EntryStore>,
    feedback: Arc<FeedbackLog>,
    relevance: RelevanceConfig,
    limits: SearchLimits,
}

impl RetrievalEngine {
    pub fn new(store: Arc<EntryStore>, config: &RetrievalConfig) -> Self {
        Self {
            store,
            feedback: Arc::new(FeedbackLog::new(&config.feedback_file)),
            relevance: config.relevance,
            limits: config.limits,
        }
    }

    /// Share an existing feedback log.
    pub fn with_feedback(mut self, feedback: Arc<FeedbackLog>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn store(&self) -> &Arc<EntryStore> {
        &self.store
    }

    pub fn feedback(&self) -> &Arc<FeedbackLog> {
        &self.feedback
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    pub fn relevance(&self) -> &RelevanceConfig {
        &self.relevance
    }

    /// Run a search.
    ///
    /// Candidates are pre-filtered by tag inside the store, scored, kept when
    /// strictly above the admission threshold and ordered best first (ties
    /// keep store order).
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        let query = request.query.trim();
        if query.is_empty() {
            return Ok(SearchOutcome::EmptyQuery);
        }

        let embedding = self.store.gateway().embed_query(query).await;
        if embedding.is_empty() {
            warn!("No query embedding for {query:?}, returning no results");
            return Ok(SearchOutcome::EmbeddingUnavailable);
        }

        let candidates = self
            .store
            .query_nearest(&embedding, &request.tag, request.fetch_limit)
            .await?;
        if candidates.is_empty() {
            self.log_failed(query).await;
            return Ok(SearchOutcome::NoCandidates);
        }

        let mut hits: Vec<ScoredEntry> = candidates
            .into_iter()
            .map(|(entry, distance)| ScoredEntry::new(entry, distance))
            .filter(|hit| self.relevance.admits(hit.score))
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        if let Some(limit) = request.display_limit {
            hits.truncate(limit);
        }

        if hits.is_empty() {
            self.log_failed(query).await;
            return Ok(SearchOutcome::NoRelevantResult);
        }

        debug!("Search {query:?} in {} admitted {} hits", request.tag, hits.len());
        Ok(SearchOutcome::Found(hits))
    }

    /// Best single answer for a chat message, across every tag.
    pub async fn best_answer(&self, query: &str) -> Result<BotAnswer> {
        let request = SearchRequest::bot(&self.limits, query);
        let outcome = self.search(&request).await?;

        Ok(match outcome {
            SearchOutcome::EmptyQuery => BotAnswer::EmptyQuery,
            SearchOutcome::Found(hits) => match hits.into_iter().next() {
                Some(hit) => {
                    let certainty = if self.relevance.is_hedged(hit.score) {
                        Certainty::Hedged
                    } else {
                        Certainty::Confident
                    };
                    BotAnswer::Answer {
                        entry: hit.entry,
                        score: hit.score,
                        certainty,
                    }
                }
                None => BotAnswer::NotFound {
                    query: query.trim().to_string(),
                },
            },
            _ => BotAnswer::NotFound {
                query: query.trim().to_string(),
            },
        })
    }

    async fn log_failed(&self, query: &str) {
        match self.feedback.record(query).await {
            Ok(()) => info!("No relevant result for {query:?}, logged for review"),
            Err(e) => warn!("Failed to log failed search {query:?}: {e}"),
        }
    }
}

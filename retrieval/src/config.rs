//! Configuration for search, browsing and feedback logging.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the retrieval layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Score thresholds.
    pub relevance: RelevanceConfig,

    /// Candidate and display counts per search mode.
    pub limits: SearchLimits,

    /// Entries per browse page.
    pub page_size: usize,

    /// JSON-lines file receiving failed searches.
    pub feedback_file: PathBuf,
}

impl RetrievalConfig {
    /// Create a configuration that logs failed searches to `feedback_file`.
    pub fn new(feedback_file: impl Into<PathBuf>) -> Self {
        Self {
            relevance: RelevanceConfig::default(),
            limits: SearchLimits::default(),
            page_size: 10,
            feedback_file: feedback_file.into(),
        }
    }

    /// Set the relevance thresholds.
    pub fn with_relevance(mut self, relevance: RelevanceConfig) -> Self {
        self.relevance = relevance;
        self
    }

    /// Set the search limits.
    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the browse page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::new("./data/failed_searches.jsonl")
    }
}

/// Score thresholds on the 0..=100 relevance scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    /// A hit is kept only when its score is strictly above this.
    pub admission_threshold: f64,

    /// Bot answers below this are prefixed with a hedge.
    pub high_confidence_threshold: f64,
}

impl RelevanceConfig {
    /// Whether a hit with `score` is kept. The threshold itself is rejected.
    pub fn admits(&self, score: f64) -> bool {
        score > self.admission_threshold
    }

    /// Whether a bot answer with `score` needs a hedge.
    pub fn is_hedged(&self, score: f64) -> bool {
        score < self.high_confidence_threshold
    }
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            admission_threshold: 32.0,
            high_confidence_threshold: 60.0,
        }
    }
}

/// How many candidates each search mode fetches and shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    /// Candidates for the paginated interactive search.
    pub interactive_fetch: usize,

    /// Candidates for the compact search.
    pub compact_fetch: usize,

    /// Results shown by the compact search.
    pub compact_display: usize,

    /// Candidates for a top-N search.
    pub top_fetch: usize,

    /// Candidates considered for a bot reply.
    pub bot_fetch: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            interactive_fetch: 50,
            compact_fetch: 20,
            compact_display: 10,
            top_fetch: 50,
            bot_fetch: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = RetrievalConfig::default();
        assert_eq!(config.relevance.admission_threshold, 32.0);
        assert_eq!(config.relevance.high_confidence_threshold, 60.0);
        assert_eq!(config.limits.interactive_fetch, 50);
        assert_eq!(config.limits.bot_fetch, 5);
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn test_admission_is_strict() {
        let relevance = RelevanceConfig::default();
        assert!(!relevance.admits(32.0));
        assert!(relevance.admits(32.1));
        assert!(!relevance.admits(0.0));
    }

    #[test]
    fn test_hedge_below_high_confidence() {
        let relevance = RelevanceConfig::default();
        assert!(relevance.is_hedged(59.9));
        assert!(!relevance.is_hedged(60.0));
        assert!(!relevance.is_hedged(95.0));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RetrievalConfig =
            serde_json::from_str(r#"{"relevance": {"admission_threshold": 30.0}}"#).unwrap();
        assert_eq!(config.relevance.admission_threshold, 30.0);
        assert_eq!(config.relevance.high_confidence_threshold, 60.0);
        assert_eq!(config.limits, SearchLimits::default());
    }
}

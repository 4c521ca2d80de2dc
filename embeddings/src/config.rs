//! Configuration for the embedding gateway.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DEFAULT_DIMENSION;
use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, GeminiProvider};

/// Configuration for the embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Model to use for embeddings.
    pub model: Option<String>,

    /// Output dimensionality requested from the provider.
    pub dimensions: Option<usize>,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Override for the provider base URL.
    pub base_url: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Bound on each memo cache; `None` keeps every vector for the process lifetime.
    pub cache_max_entries: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Gemini,
            model: None,
            dimensions: Some(DEFAULT_DIMENSION),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            base_url: None,
            timeout_secs: 30,
            cache_max_entries: None,
        }
    }
}

impl EmbeddingConfig {
    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the cache bound.
    pub fn with_cache_max_entries(mut self, max_entries: usize) -> Self {
        self.cache_max_entries = Some(max_entries);
        self
    }

    /// Build the configured provider.
    ///
    /// Fails when the provider needs an API key and the configured
    /// environment variable is unset.
    pub fn build_provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.provider {
            EmbeddingProviderType::Gemini => {
                let api_key = std::env::var(&self.api_key_env)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
                    .ok_or(EmbeddingError::ProviderNotConfigured)?;

                let mut provider = GeminiProvider::new()
                    .with_api_key(api_key)
                    .with_timeout(Duration::from_secs(self.timeout_secs.max(1)));
                if let Some(model) = &self.model {
                    provider = provider.with_model(model);
                }
                if let Some(dimensions) = self.dimensions {
                    provider = provider.with_dimensions(dimensions);
                }
                if let Some(base_url) = &self.base_url {
                    provider = provider.with_base_url(base_url);
                }
                Ok(Arc::new(provider))
            }
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// Google Gemini embeddings API.
    Gemini,
}

//! Memoised text-to-vector translation.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::Embedding;
use crate::cache::EmbeddingCache;
use crate::config::EmbeddingConfig;
use crate::context::EmbeddingContext;
use crate::error::Result;
use crate::provider::{EmbeddingProvider, EmbeddingRequest, TaskType};

/// Single entry point for embeddings.
///
/// Constructed once per process and shared by reference. Document-side and
/// query-side vectors are cached separately because the provider tunes them
/// differently for the same text. Provider failures never escape: they are
/// logged and an empty vector is returned instead, which callers treat as
/// "no results".
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    document_cache: EmbeddingCache,
    query_cache: EmbeddingCache,
}

impl EmbeddingGateway {
    /// Create a gateway with unbounded caches.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            document_cache: EmbeddingCache::new(),
            query_cache: EmbeddingCache::new(),
        }
    }

    /// Create a gateway from configuration.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let provider = config.build_provider()?;
        Ok(match config.cache_max_entries {
            Some(max) => Self::new(provider).with_caches(
                EmbeddingCache::bounded(max),
                EmbeddingCache::bounded(max),
            ),
            None => Self::new(provider),
        })
    }

    /// Replace the caches.
    pub fn with_caches(mut self, document_cache: EmbeddingCache, query_cache: EmbeddingCache) -> Self {
        self.document_cache = document_cache;
        self.query_cache = query_cache;
        self
    }

    /// Name of the underlying provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Build the document-side embedding input for an entry.
    ///
    /// `tag_description` is the catalog description of `tag`, or empty when
    /// the tag is not in the catalog.
    pub fn build_context(
        &self,
        title: &str,
        answer_text: &str,
        keywords: &str,
        tag: &str,
        tag_description: &str,
    ) -> String {
        EmbeddingContext::new(tag, title, answer_text)
            .with_tag_description(tag_description)
            .with_keywords(keywords)
            .render()
    }

    /// Embed text that will be stored. Empty on provider failure.
    pub async fn embed_document(&self, text: &str) -> Embedding {
        self.embed_cached(text, TaskType::RetrievalDocument, &self.document_cache)
            .await
    }

    /// Embed a user query. Empty on provider failure.
    pub async fn embed_query(&self, text: &str) -> Embedding {
        self.embed_cached(text, TaskType::RetrievalQuery, &self.query_cache)
            .await
    }

    /// Document-side cache, exposed for statistics.
    pub fn document_cache(&self) -> &EmbeddingCache {
        &self.document_cache
    }

    /// Query-side cache, exposed for statistics.
    pub fn query_cache(&self) -> &EmbeddingCache {
        &self.query_cache
    }

    async fn embed_cached(&self, text: &str, task: TaskType, cache: &EmbeddingCache) -> Embedding {
        if let Some(embedding) = cache.get(text).await {
            debug!("Cache hit for {} embedding", task.as_str());
            return embedding;
        }

        let request = EmbeddingRequest::new(text).with_task(task);
        match self.provider.embed(request).await {
            Ok(response) if !response.embedding.is_empty() => {
                cache.put(text, response.embedding.clone()).await;
                response.embedding
            }
            Ok(_) => {
                warn!("Provider {} returned an empty embedding", self.provider.name());
                Vec::new()
            }
            Err(e) => {
                warn!("Embedding via {} failed: {e}", self.provider.name());
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbeddingError;
    use crate::provider::EmbeddingResponse;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns `[len, task]` and counts calls; fails on texts containing "boom".
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn default_model(&self) -> &str {
            "counting-1"
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.text.contains("boom") {
                return Err(EmbeddingError::ApiRequest("boom".to_string()));
            }
            let task = match request.task {
                TaskType::RetrievalDocument => 0.0,
                TaskType::RetrievalQuery => 1.0,
            };
            Ok(EmbeddingResponse {
                embedding: vec![request.text.len() as f32, task],
                model: "counting-1".to_string(),
                dimension: 2,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn gateway() -> (EmbeddingGateway, Arc<CountingProvider>) {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        (EmbeddingGateway::new(provider.clone()), provider)
    }

    #[tokio::test]
    async fn test_identical_text_embeds_once() {
        let (gateway, provider) = gateway();

        let first = gateway.embed_query("reset password").await;
        let second = gateway.embed_query("reset password").await;

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_document_and_query_sides_are_separate() {
        let (gateway, provider) = gateway();

        let doc = gateway.embed_document("reset password").await;
        let query = gateway.embed_query("reset password").await;

        assert_eq!(doc, vec![14.0, 0.0]);
        assert_eq!(query, vec![14.0, 1.0]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_returns_empty_and_is_not_cached() {
        let (gateway, provider) = gateway();

        assert!(gateway.embed_query("boom").await.is_empty());
        assert!(gateway.embed_query("boom").await.is_empty());

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert!(!gateway.query_cache().contains("boom").await);
    }

    #[tokio::test]
    async fn test_build_context_uses_description() {
        let (gateway, _) = gateway();
        let text = gateway.build_context("Title", "Body [GAMBAR 1]", "kw", "OPD", "Poli");
        assert_eq!(
            text,
            "DOMAIN: OPD (Poli)\nDOKUMEN: Title\nVARIASI PERTANYAAN USER: kw\nISI KONTEN: Body"
        );
    }
}

//! Embedding providers.
//!
//! The gateway talks to providers through [`EmbeddingProvider`]; the
//! production implementation is Google's Gemini `embedContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// What the embedding will be used for.
///
/// Gemini tunes the vector differently for stored documents and for the
/// queries that search them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Text that will be stored and searched against.
    RetrievalDocument,
    /// Text a user typed to search with.
    RetrievalQuery,
}

impl TaskType {
    /// Wire name understood by the Gemini API.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            TaskType::RetrievalQuery => "RETRIEVAL_QUERY",
        }
    }
}

/// Request for generating embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Text to embed.
    pub text: String,

    /// Intended use of the vector.
    pub task: TaskType,

    /// Model to use (provider-specific).
    pub model: Option<String>,

    /// Dimensions for the output (if supported by provider).
    pub dimensions: Option<usize>,
}

impl EmbeddingRequest {
    /// Create a new document-side embedding request.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            task: TaskType::RetrievalDocument,
            model: None,
            dimensions: None,
        }
    }

    /// Set the task type.
    pub fn with_task(mut self, task: TaskType) -> Self {
        self.task = task;
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the output dimensions.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

/// Response from embedding generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The generated embedding.
    pub embedding: Embedding,

    /// Model used to generate the embedding.
    pub model: String,

    /// Dimension of the embedding.
    pub dimension: usize,
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;

    /// Generate an embedding for the given text.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;

    /// Check if the provider is available (API key set, etc.).
    fn is_available(&self) -> bool;
}

/// Gemini embedding provider.
pub struct GeminiProvider {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Default model.
    default_model: String,

    /// Requested output dimensionality.
    dimensions: Option<usize>,

    /// Longest input accepted before the request is refused locally.
    max_input_chars: usize,
}

impl GeminiProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";
    pub const DEFAULT_MODEL: &'static str = "gemini-embedding-001";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a new Gemini provider, reading the key from `GOOGLE_API_KEY`.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("GOOGLE_API_KEY").ok(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            client: build_client(Self::DEFAULT_TIMEOUT),
            default_model: Self::DEFAULT_MODEL.to_string(),
            dimensions: None,
            max_input_chars: 30_000,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Request a fixed output dimensionality.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Replace the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    fn model_path(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        }
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

impl Default for GeminiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(EmbeddingError::ProviderNotConfigured)?;

        let length = request.text.chars().count();
        if length > self.max_input_chars {
            return Err(EmbeddingError::TextTooLong {
                length,
                max_length: self.max_input_chars,
            });
        }

        let model = Self::model_path(request.model.as_deref().unwrap_or(&self.default_model));
        let dimensions = request.dimensions.or(self.dimensions);

        debug!("Generating {} embedding with model: {model}", request.task.as_str());

        let mut body = serde_json::json!({
            "model": model,
            "content": { "parts": [{ "text": request.text }] },
            "taskType": request.task.as_str(),
        });

        if let Some(dims) = dimensions {
            body["outputDimensionality"] = serde_json::json!(dims);
        }

        let response = self
            .client
            .post(format!("{}/{model}:embedContent", self.base_url))
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "API error ({status}): {error_text}"
            )));
        }

        let result: GeminiEmbedResponse = response.json().await?;
        let embedding = result.embedding.values;

        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "No embedding values in response".to_string(),
            ));
        }

        if let Some(expected) = dimensions {
            if embedding.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        let dimension = embedding.len();
        info!("Generated embedding with {dimension} dimensions");

        Ok(EmbeddingResponse {
            embedding,
            model,
            dimension,
        })
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Gemini API response format.
#[derive(Debug, Deserialize)]
struct GeminiEmbedResponse {
    embedding: GeminiEmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbeddingValues {
    values: Vec<f32>,
}

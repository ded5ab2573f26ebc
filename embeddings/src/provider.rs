//! Embedding providers.
//!
//! A provider turns an ordered batch of texts into an equally ordered batch
//! of fixed-dimension vectors. The OpenAI-compatible provider talks to any
//! server exposing `POST {base_url}/embeddings`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Embed `texts`, returning one vector per text in input order.
    ///
    /// Fails as a whole on any network or malformed-response condition.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Embedding> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding in response".to_string()))
    }
}

/// Connection settings for an OpenAI-compatible embedding endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// API base URL, including the version segment (e.g. `https://api.openai.com/v1`).
    pub base_url: String,

    /// Bearer token. `None` leaves the provider unconfigured.
    pub api_key: Option<String>,

    /// Model to request.
    pub model: String,

    /// Maximum number of texts sent in one request.
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            batch_size: 64,
        }
    }
}

impl EmbeddingConfig {
    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// OpenAI-compatible embedding provider.
pub struct OpenAIProvider {
    config: EmbeddingConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a provider from its configuration.
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Whether an API key is present.
    pub fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn embed_chunk(&self, api_key: &str, texts: &[String]) -> Result<Vec<Embedding>> {
        let body = serde_json::json!({
            "input": texts,
            "model": self.config.model,
        });

        let response = self
            .client
            .post(format!(
                "{}/embeddings",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(api_key)
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
                "{status}: {error_text}"
            )));
        }

        let result: OpenAIEmbeddingResponse = response.json().await?;
        if result.data.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            )));
        }

        let mut data = result.data;
        data.sort_by_key(|item| item.index);
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(EmbeddingError::ProviderNotConfigured)?;

        let batch_size = self.config.batch_size.max(1);
        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(batch_size) {
            debug!(
                "Requesting {} embeddings with model {}",
                chunk.len(),
                self.config.model
            );
            embeddings.extend(self.embed_chunk(api_key, chunk).await?);
        }

        info!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

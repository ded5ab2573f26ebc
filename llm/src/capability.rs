//! The generation capability the retrieval layer depends on.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::tool::{ToolChoice, ToolSchema};

/// Ordered answer fragments. Dropping the stream cancels generation.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Everything retrieval needs from a language model.
#[async_trait]
pub trait GenerationCapability: Send + Sync {
    /// Pick one of `tools` for `query`, or [`ToolChoice::NoTool`].
    async fn decide_tool(&self, query: &str, tools: &[ToolSchema]) -> Result<ToolChoice>;

    /// Answer `query` from `context` only.
    async fn generate_with_context(&self, query: &str, context: &str) -> Result<TextStream>;

    /// Answer `query` from general knowledge.
    async fn generate_without_context(&self, query: &str) -> Result<TextStream>;

    /// Whether `context` can answer `query`.
    async fn validate_relevance(&self, query: &str, context: &str) -> Result<bool>;

    /// At most `max_count` search keywords for `query`.
    async fn extract_keywords(&self, query: &str, max_count: usize) -> Result<Vec<String>>;
}

//! Configuration for retrieval.

use memos_source::RecentScope;
use serde::{Deserialize, Serialize};

/// Configuration for the retrieval orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Top semantic score below which the keyword fallback runs.
    pub score_threshold: f32,

    /// Result limit when the caller or the model gives none.
    pub max_results: usize,

    /// Most keywords requested from the extraction capability.
    pub max_keywords: usize,

    /// Queries with at most this many words are used verbatim as the
    /// keyword when extraction yields nothing.
    pub short_query_words: usize,

    /// Which notes "latest memos" may return.
    pub latest_memos_scope: LatestMemosScope,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.7,
            max_results: 5,
            max_keywords: 5,
            short_query_words: 3,
            latest_memos_scope: LatestMemosScope::default(),
        }
    }
}

impl RetrievalConfig {
    /// Set the keyword fallback threshold.
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Set the default result limit.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the latest-memos scope.
    pub fn with_latest_memos_scope(mut self, scope: LatestMemosScope) -> Self {
        self.latest_memos_scope = scope;
        self
    }
}

/// Filter applied to "latest memos" requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatestMemosScope {
    /// Active, private notes only, like every other listing.
    #[default]
    ActiveOnly,
    /// Any note, including archived and shared ones.
    Unfiltered,
}

impl From<LatestMemosScope> for RecentScope {
    fn from(scope: LatestMemosScope) -> Self {
        match scope {
            LatestMemosScope::ActiveOnly => Self::ActiveOnly,
            LatestMemosScope::Unfiltered => Self::Unfiltered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: RetrievalConfig = serde_json::from_str(
            r#"{"score_threshold": 0.5, "latest_memos_scope": "unfiltered"}"#,
        )
        .unwrap();
        assert_eq!(config.score_threshold, 0.5);
        assert_eq!(config.max_results, 5);
        assert_eq!(config.latest_memos_scope, LatestMemosScope::Unfiltered);
        assert_eq!(
            RecentScope::from(config.latest_memos_scope),
            RecentScope::Unfiltered
        );
    }
}

//! Retrieval orchestrator implementation.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use memos_embeddings::EmbeddingProvider;
use memos_llm::{GenerationCapability, TextStream, ToolChoice, memo_tools};
use memos_source::{DocId, Document, SensitiveContentFilter, SourceError, SourceRepository};
use memos_vector_index::VectorIndex;
use tracing::{debug, info, warn};

use crate::config::RetrievalConfig;
use crate::context::{Provenance, SearchResult, assemble_context};
use crate::error::Result;

/// First fragment of every answer not grounded in the user's notes.
pub const GENERAL_KNOWLEDGE_NOTICE: &str =
    "(Note: the following is a general AI-generated answer, not based on your notes.)\n\n";

/// What an answer is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grounding {
    /// The retrieved notes.
    Notes,
    /// The model's general knowledge.
    GeneralKnowledge,
}

/// A streamed answer. Dropping `fragments` cancels generation.
pub struct Answer {
    pub grounding: Grounding,
    /// Notes given to the model as context. Empty for general answers.
    pub notes: Vec<SearchResult>,
    pub fragments: TextStream,
}

impl Answer {
    /// Wait for the whole answer.
    pub async fn into_text(self) -> memos_llm::Result<String> {
        self.fragments.try_collect::<Vec<_>>().await.map(|parts| parts.concat())
    }
}

impl fmt::Debug for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Answer")
            .field("grounding", &self.grounding)
            .field("notes", &self.notes)
            .finish_non_exhaustive()
    }
}

/// Answers questions over the notes.
///
/// Holds its collaborators by `Arc` so one instance, built at startup, can
/// be shared by every caller.
pub struct RetrievalOrchestrator {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    source: Arc<dyn SourceRepository>,
    generator: Arc<dyn GenerationCapability>,
    filter: SensitiveContentFilter,
    config: RetrievalConfig,
}

impl RetrievalOrchestrator {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        source: Arc<dyn SourceRepository>,
        generator: Arc<dyn GenerationCapability>,
    ) -> Self {
        Self {
            embedder,
            index,
            source,
            generator,
            filter: SensitiveContentFilter::default(),
            config: RetrievalConfig::default(),
        }
    }

    /// Set the filter applied during context assembly.
    pub fn with_filter(mut self, filter: SensitiveContentFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Hybrid search: vector search, then a keyword fallback when the best
    /// semantic score is below the threshold.
    ///
    /// Keyword hits are ranked ahead of every semantic hit regardless of
    /// score. An embedding failure fails the search; a keyword-phase
    /// failure only drops the keyword results.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        debug!("Searching notes for {query:?} (limit {limit})");

        let query_vector = self.embedder.embed_one(query).await?;
        let hits = self.index.search(&query_vector, limit).await?;
        let top_score = hits.first().map_or(0.0, |hit| hit.score);

        let mut seen: HashSet<DocId> = HashSet::new();
        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let id = DocId::from(hit.id);
            match self.source.get_by_id(&id).await {
                Ok(Some(doc)) if doc.is_active() => {
                    seen.insert(id);
                    results.push(SearchResult::from_document(
                        doc,
                        hit.score,
                        Provenance::Semantic,
                    ));
                }
                Ok(Some(_)) => debug!("Skipping inactive note {id}"),
                Ok(None) | Err(SourceError::NotFound(_)) => {
                    debug!("Skipping indexed note {id} missing from the source");
                }
                Err(e) => return Err(e.into()),
            }
        }

        if top_score < self.config.score_threshold {
            info!(
                "Top semantic score {top_score:.3} below {}, trying keywords",
                self.config.score_threshold
            );
            for doc in self.keyword_candidates(query, limit).await {
                if seen.insert(doc.id.clone()) {
                    results.push(SearchResult::from_document(doc, 0.0, Provenance::Keyword));
                }
            }
        }

        // Stable: keeps semantic order within each group.
        results.sort_by_key(|result| result.provenance != Provenance::Keyword);
        results.truncate(limit);
        Ok(results)
    }

    /// Keyword fallback. Any failure yields no candidates.
    async fn keyword_candidates(&self, query: &str, limit: usize) -> Vec<Document> {
        let mut keywords = match self
            .generator
            .extract_keywords(query, self.config.max_keywords)
            .await
        {
            Ok(keywords) => keywords,
            Err(e) => {
                warn!("Keyword extraction failed: {e}");
                Vec::new()
            }
        };

        let query = query.trim();
        if keywords.is_empty()
            && !query.is_empty()
            && query.split_whitespace().count() <= self.config.short_query_words
        {
            keywords.push(query.to_string());
        }
        if keywords.is_empty() {
            return Vec::new();
        }

        debug!("Keyword search with {keywords:?}");
        match self
            .source
            .find_by_keywords(&keywords, limit.saturating_mul(2))
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                warn!("Keyword search failed: {e}");
                Vec::new()
            }
        }
    }

    /// The most recently created notes, newest first. Bypasses the index.
    pub async fn latest(&self, limit: usize) -> Result<Vec<SearchResult>> {
        let docs = self
            .source
            .list_recent(limit, self.config.latest_memos_scope.into())
            .await?;
        Ok(docs
            .into_iter()
            .map(|doc| SearchResult::from_document(doc, 0.0, Provenance::Recent))
            .collect())
    }

    /// Run the operation the model routes `question` to.
    pub async fn route(&self, question: &str) -> Result<Vec<SearchResult>> {
        let choice = match self.generator.decide_tool(question, &memo_tools()).await {
            Ok(choice) => choice,
            Err(e) => {
                warn!("Tool decision failed, falling back to search: {e}");
                ToolChoice::NoTool
            }
        };
        debug!("Routing {question:?} to {choice:?}");

        let default_limit = self.config.max_results;
        match choice {
            ToolChoice::GetLatestMemos { limit } => {
                self.latest(limit.filter(|l| *l > 0).unwrap_or(default_limit))
                    .await
            }
            ToolChoice::SearchMemos { query, limit } => {
                let query = if query.trim().is_empty() {
                    question
                } else {
                    query.as_str()
                };
                self.search(query, limit.filter(|l| *l > 0).unwrap_or(default_limit))
                    .await
            }
            ToolChoice::NoTool => self.search(question, default_limit).await,
        }
    }

    /// Answer `question`, grounded in the notes when they are relevant.
    ///
    /// Retrieved notes pass the sensitive-content filter before they reach
    /// the model. With no usable notes, or notes the model judges
    /// irrelevant, the answer comes from general knowledge and starts with
    /// [`GENERAL_KNOWLEDGE_NOTICE`].
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let retrieved = self.route(question).await?;
        let context = assemble_context(retrieved, &self.filter);

        if context.is_empty() {
            info!("No usable notes, answering from general knowledge");
            return self.general_answer(question).await;
        }

        let relevant = match self
            .generator
            .validate_relevance(question, &context.text)
            .await
        {
            Ok(relevant) => relevant,
            Err(e) => {
                warn!("Relevance check failed, treating notes as irrelevant: {e}");
                false
            }
        };
        if !relevant {
            info!("Notes judged irrelevant, answering from general knowledge");
            return self.general_answer(question).await;
        }

        let fragments = self
            .generator
            .generate_with_context(question, &context.text)
            .await?;
        Ok(Answer {
            grounding: Grounding::Notes,
            notes: context.notes,
            fragments,
        })
    }

    async fn general_answer(&self, question: &str) -> Result<Answer> {
        let generated = self.generator.generate_without_context(question).await?;
        let fragments = stream::once(async { Ok(GENERAL_KNOWLEDGE_NOTICE.to_string()) })
            .chain(generated)
            .boxed();
        Ok(Answer {
            grounding: Grounding::GeneralKnowledge,
            notes: Vec::new(),
            fragments,
        })
    }
}

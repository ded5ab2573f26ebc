use std::fmt::Write as _;

use anyhow::{Context, Result};
use memos_retrieval::{Provenance, SearchResult};

use crate::app::App;

const PREVIEW_CHARS: usize = 120;

pub async fn search(app: &App, query: &str, limit: Option<usize>) -> Result<()> {
    let orchestrator = app.orchestrator();
    let limit = limit.unwrap_or(orchestrator.config().max_results);
    let results = orchestrator
        .search(query, limit)
        .await
        .context("search failed")?;
    print!("{}", render_results(&results));
    Ok(())
}

pub async fn latest(app: &App, limit: Option<usize>) -> Result<()> {
    let orchestrator = app.orchestrator();
    let limit = limit.unwrap_or(orchestrator.config().max_results);
    let results = orchestrator
        .latest(limit)
        .await
        .context("failed to list the latest notes")?;
    print!("{}", render_results(&results));
    Ok(())
}

/// One header line per result, then an indented single-line preview.
pub fn render_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No matching notes.\n".to_string();
    }

    let mut out = String::new();
    for (rank, result) in results.iter().enumerate() {
        let how = match result.provenance {
            Provenance::Semantic => format!("score {:.3}", result.score),
            Provenance::Keyword => "keyword match".to_string(),
            Provenance::Recent => "recent".to_string(),
        };
        let _ = writeln!(
            out,
            "{}. #{} ({how}) created {}",
            rank + 1,
            result.id,
            result.created_at.format("%Y-%m-%d %H:%M"),
        );
        let _ = writeln!(out, "   {}", preview(&result.content));
    }
    out
}

fn preview(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use memos_source::Document;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_results() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        let results = vec![
            SearchResult::from_document(
                Document::new(7_i64, "birds\nnest", at),
                0.0,
                Provenance::Keyword,
            ),
            SearchResult::from_document(
                Document::new(1_i64, "cats are great", at),
                0.9123,
                Provenance::Semantic,
            ),
        ];
        assert_eq!(
            render_results(&results),
            "1. #7 (keyword match) created 2023-11-14 22:13\n   birds nest\n\
             2. #1 (score 0.912) created 2023-11-14 22:13\n   cats are great\n"
        );
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(render_results(&[]), "No matching notes.\n");
    }

    #[test]
    fn test_long_preview_is_cut() {
        let long = "word ".repeat(100);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);
        assert!(shown.ends_with("..."));
    }
}

use anyhow::{Context, Result};
use futures::StreamExt;
use memos_retrieval::{Grounding, SearchResult};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::app::App;

/// Stream the answer to stdout as it is generated.
pub async fn run(app: &App, question: &str) -> Result<()> {
    let answer = app
        .orchestrator()
        .answer(question)
        .await
        .context("failed to answer the question")?;
    debug!("Answer grounded in {:?}", answer.grounding);

    let mut stdout = tokio::io::stdout();
    let mut fragments = answer.fragments;
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment.context("answer stream failed")?;
        stdout.write_all(fragment.as_bytes()).await?;
        stdout.flush().await?;
    }
    stdout.write_all(b"\n").await?;

    if answer.grounding == Grounding::Notes {
        stdout
            .write_all(render_sources(&answer.notes).as_bytes())
            .await?;
    }
    stdout.flush().await?;
    Ok(())
}

pub fn render_sources(notes: &[SearchResult]) -> String {
    let ids = notes
        .iter()
        .map(|note| format!("#{}", note.id))
        .collect::<Vec<_>>()
        .join(", ");
    format!("\nSources: {ids}\n")
}

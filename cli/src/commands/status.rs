use std::fmt::Write as _;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use memos_source::{DocId, SourceRepository};
use memos_sync::WatermarkStore;
use memos_vector_index::{IndexStats, VectorIndex};
use tracing::warn;

use crate::app::App;

const RULE: &str = "====================";

pub async fn status(app: &App) -> Result<()> {
    let stats = app.index.stats().await;
    let ids = app.index.all_ids().await;
    let watermark = WatermarkStore::new(app.config.watermark_path()).load().await;
    print!("{}", render_status(&stats, ids.len(), watermark));
    Ok(())
}

pub fn render_status(stats: &IndexStats, id_count: usize, watermark: DateTime<Utc>) -> String {
    let dimension = stats
        .dimension
        .map_or_else(|| "unset".to_string(), |d| d.to_string());
    let watermark = if watermark.timestamp() == 0 {
        "never synced".to_string()
    } else {
        watermark.to_rfc3339_opts(SecondsFormat::Secs, true)
    };
    format!(
        "Vectors:    {}\nIds:        {id_count}\nDimension:  {dimension}\nGeneration: {}\nLast sync:  {watermark}\n",
        stats.vectors, stats.generation,
    )
}

/// Print every indexed note with its current content.
pub async fn indexed(app: &App) -> Result<()> {
    let mut ids = app.index.all_ids().await;
    if ids.is_empty() {
        println!("The index is empty.");
        return Ok(());
    }
    ids.sort_by_key(|id| (id.parse::<i64>().ok(), id.clone()));
    println!("{} notes in the index.", ids.len());

    let mut printed = 0;
    let mut out = String::new();
    for id in ids {
        let id = DocId::from(id);
        match app.source.get_by_id(&id).await? {
            Some(doc) => {
                printed += 1;
                let _ = write!(
                    out,
                    "{RULE}\nNote #{printed} (ID: {})\n{}\n{}\n",
                    doc.id,
                    "-".repeat(RULE.len()),
                    doc.content
                );
            }
            None => warn!("Indexed note {id} is missing from the notes database"),
        }
    }
    if printed > 0 {
        out.push_str(RULE);
        out.push('\n');
    }
    print!("{out}");
    println!("Printed {printed} notes.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_status() {
        let stats = IndexStats {
            vectors: 12,
            dimension: Some(1536),
            generation: 4,
        };
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        assert_eq!(
            render_status(&stats, 12, at),
            "Vectors:    12\nIds:        12\nDimension:  1536\nGeneration: 4\n\
             Last sync:  2023-11-14T22:13:20Z\n"
        );
    }

    #[test]
    fn test_render_status_before_first_sync() {
        let stats = IndexStats {
            vectors: 0,
            dimension: None,
            generation: 0,
        };
        let rendered = render_status(&stats, 0, DateTime::<Utc>::UNIX_EPOCH);
        assert!(rendered.contains("Dimension:  unset"));
        assert!(rendered.contains("Last sync:  never synced"));
    }
}

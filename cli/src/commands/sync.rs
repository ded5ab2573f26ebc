use anyhow::{Context, Result};
use chrono::SecondsFormat;
use memos_sync::{SyncMode, SyncReport};

use crate::app::App;

pub async fn run(app: &App, full: bool) -> Result<()> {
    let mode = if full {
        SyncMode::Full
    } else {
        SyncMode::Incremental
    };
    let report = app
        .sync_engine()
        .run(mode)
        .await
        .context("sync failed")?;
    println!("{}", render_report(&report));
    Ok(())
}

pub fn render_report(report: &SyncReport) -> String {
    let mode = match report.mode {
        SyncMode::Incremental => "Incremental",
        SyncMode::Full => "Full",
    };
    format!(
        "{mode} sync complete: {} indexed, {} removed, {} withheld as sensitive. Watermark {}.",
        report.indexed,
        report.deleted,
        report.skipped_sensitive,
        report.watermark.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_report() {
        let report = SyncReport {
            mode: SyncMode::Incremental,
            indexed: 3,
            deleted: 1,
            skipped_sensitive: 2,
            watermark: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap(),
        };
        assert_eq!(
            render_report(&report),
            "Incremental sync complete: 3 indexed, 1 removed, 2 withheld as sensitive. \
             Watermark 2023-11-14T22:13:20Z."
        );
    }
}

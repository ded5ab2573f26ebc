use anyhow::Result;
use clap::Parser;
use memos_cli::{AppConfig, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine.
    dotenvy::dotenv().ok();
    init_tracing(cli.log_level.as_deref());

    let config = AppConfig::load(cli.config.as_deref())?;
    memos_cli::run(cli.command, config).await
}

/// Logs go to stderr so streamed answers on stdout stay clean.
fn init_tracing(log_level: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(log_level))
        .with_writer(std::io::stderr)
        .init();
}

/// `--log-level`, else `RUST_LOG`, else `info`. Unparsable filters fall back
/// to `info`.
fn env_filter(log_level: Option<&str>) -> EnvFilter {
    match log_level {
        Some(level) => EnvFilter::try_new(level).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_log_level_flag_sets_filter() {
        assert_eq!(
            env_filter(Some("memos_sync=debug")).to_string(),
            "memos_sync=debug"
        );
    }

    #[test]
    fn test_bad_log_level_falls_back_to_info() {
        assert_eq!(env_filter(Some("memos_sync=loud")).to_string(), "info");
    }
}

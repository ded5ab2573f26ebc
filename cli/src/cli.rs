//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Ask questions about your Memos notes.
#[derive(Debug, Parser)]
#[command(name = "memos-assistant", version)]
pub struct Cli {
    /// Path to the TOML configuration file.
    ///
    /// Defaults to `memos-assistant/config.toml` under the platform config
    /// directory, if it exists.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `memos_sync=debug`. Overrides `RUST_LOG`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Commands {
    /// Bring the index up to date with the notes database.
    Sync {
        /// Rebuild the whole index instead of applying changes since the
        /// last sync.
        #[arg(long)]
        full: bool,
    },

    /// Answer a question, streaming the reply to stdout.
    Ask {
        /// The question.
        question: String,
    },

    /// Hybrid search over the notes.
    Search {
        query: String,

        /// Maximum number of results. Defaults to `retrieval.max_results`.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// The most recently created notes.
    Latest {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print every indexed note with its content.
    Indexed,

    /// Show index and sync state.
    Status,
}

//! # Memos assistant CLI
//!
//! The `memos-assistant` binary: keeps the vector index in step with a Memos
//! database and answers questions from it.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `memos-assistant sync [--full]` | Index notes changed since the last sync, or rebuild |
//! | `memos-assistant ask "<question>"` | Stream an answer grounded in the notes |
//! | `memos-assistant search "<query>" [--limit N]` | Hybrid search |
//! | `memos-assistant latest [--limit N]` | Most recently created notes |
//! | `memos-assistant indexed` | Print every indexed note |
//! | `memos-assistant status` | Index size, dimension and last sync |
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────────────────────────────┐
//! │ AppConfig│──►│ App                                          │
//! └──────────┘   │  SqliteRepository  FlatVectorIndex           │
//!                │  OpenAIProvider    OpenAiChat                │
//!                │     │                  │                     │
//!                │     ▼                  ▼                     │
//!                │  SyncEngine      RetrievalOrchestrator       │
//!                └──────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;

use anyhow::Result;

pub use app::App;
pub use cli::{Cli, Commands};
pub use config::AppConfig;

/// Open the services and run one command.
pub async fn run(command: Commands, config: AppConfig) -> Result<()> {
    let app = App::open(config).await?;
    let result = match command {
        Commands::Sync { full } => commands::sync::run(&app, full).await,
        Commands::Ask { question } => commands::ask::run(&app, &question).await,
        Commands::Search { query, limit } => commands::search::search(&app, &query, limit).await,
        Commands::Latest { limit } => commands::search::latest(&app, limit).await,
        Commands::Indexed => commands::status::indexed(&app).await,
        Commands::Status => commands::status::status(&app).await,
    };
    app.close().await;
    result
}

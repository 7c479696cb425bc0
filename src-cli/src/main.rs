//! `autonews` - trigger translation runs and watch their progress.

mod commands;
mod events;
mod state;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use state::AppState;

#[derive(Parser)]
#[command(name = "autonews")]
#[command(author, version, about = "Translation pipeline orchestrator", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, env = "AUTONEWS_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "autonews=trace" (RUST_LOG wins)
    #[arg(long, global = true)]
    log: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List inbox records, newest first
    List {
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },

    /// Show one record and its processing state
    Show { id: u64 },

    /// Create an inbox record
    Create {
        /// Raw text; read from --file when omitted
        #[arg(long, conflicts_with = "file")]
        body: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(long)]
        notes: Option<String>,

        /// Start a translation into this language right away
        #[arg(long, value_name = "LANG")]
        translate: Option<String>,
    },

    /// Translate a record and follow the run
    Run {
        id: u64,

        /// Target language; defaults to the prepared body's tag, then the configured default
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Reset a record to `new` and translate it again from the first step
    Retranslate {
        id: u64,

        #[arg(short, long)]
        language: Option<String>,
    },

    /// Print the processing state of all tracked records
    Status,

    /// Restart runs left behind by a previous process and follow them
    Resume,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    autonews::init_logging(cli.log.as_deref(), cli.json_logs)?;
    info!("Starting autonews v{}", env!("CARGO_PKG_VERSION"));

    let app = AppState::load(cli.config.as_deref())?;

    match cli.command {
        Commands::List { page, page_size } => commands::inbox::list(&app, page, page_size).await,
        Commands::Show { id } => commands::inbox::show(&app, id).await,
        Commands::Create {
            body,
            file,
            notes,
            translate,
        } => commands::inbox::create(&app, body, file, notes, translate).await,
        Commands::Run { id, language } => commands::runs::run(&app, id, language).await,
        Commands::Retranslate { id, language } => {
            commands::runs::retranslate(&app, id, language).await
        }
        Commands::Status => commands::runs::status(&app),
        Commands::Resume => commands::runs::resume(&app).await,
    }
}

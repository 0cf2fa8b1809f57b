//! innkeep CLI: the main entry point.
//!
//! Commands:
//! - `init`: Write a default config file
//! - `daemon`: Run the template scheduler until Ctrl+C
//! - `draft`: Generate an AI draft reply for a reservation
//! - `send`: Send a host reply and record its outcome
//! - `scan`: Run one template scan now
//! - `import-knowledge`: Import a guest-guide JSON export
//! - `detect-templates`: Flag repeated host messages as templates
//! - `stats`: Show per-category draft accuracy

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "innkeep",
    about = "innkeep: AI draft replies and scheduled guest messages",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.innkeep/config.toml)
    #[arg(short, long, global = true, env = "INNKEEP_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Run the template scheduler until interrupted
    Daemon,

    /// Generate an AI draft reply for a reservation
    Draft {
        /// Local reservation id
        reservation_id: i64,
    },

    /// Send a host reply to the guest
    Send {
        /// Local reservation id
        reservation_id: i64,

        /// Reply text as it should be sent
        #[arg(short, long)]
        body: String,

        /// The AI draft this reply started from, if any
        #[arg(long)]
        original_draft: Option<String>,

        /// Confidence reported with the draft
        #[arg(long)]
        confidence: Option<f32>,

        /// Category label reported with the draft
        #[arg(long)]
        category: Option<String>,
    },

    /// Run one template scan immediately
    Scan,

    /// Import the guest guide JSON export into the knowledge base
    ImportKnowledge {
        /// Path to the guide JSON file
        path: PathBuf,

        /// Keep previously imported entries instead of replacing them
        #[arg(long)]
        append: bool,
    },

    /// Flag host messages that repeat often enough to be templates
    DetectTemplates {
        #[arg(long, default_value_t = innkeep_agent::detector::DEFAULT_MIN_OCCURRENCES)]
        min_occurrences: usize,
    },

    /// Show per-category draft accuracy
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => commands::init::run(config_path, force).await?,
        Commands::Daemon => commands::daemon::run(config_path).await?,
        Commands::Draft { reservation_id } => {
            commands::draft::run(config_path, reservation_id).await?
        }
        Commands::Send {
            reservation_id,
            body,
            original_draft,
            confidence,
            category,
        } => {
            commands::send::run(
                config_path,
                commands::send::SendArgs {
                    reservation_id,
                    body,
                    original_draft,
                    confidence,
                    category,
                },
            )
            .await?
        }
        Commands::Scan => commands::scan::run(config_path).await?,
        Commands::ImportKnowledge { path, append } => {
            commands::knowledge::run(config_path, &path, !append).await?
        }
        Commands::DetectTemplates { min_occurrences } => {
            commands::detect::run(config_path, min_occurrences).await?
        }
        Commands::Stats => commands::stats::run(config_path).await?,
    }

    Ok(())
}

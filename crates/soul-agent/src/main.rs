//! soul-agent — personal digital-activity daemon.
//!
//! Main entry point for the CLI: the `start` command boots the daemon
//! (producers, pipeline, insight scheduler, HTTP surface); the remaining
//! commands are thin HTTP clients against a running daemon.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

mod client;
mod commands;
mod daemon;

use commands::{note, start, status, stop};

// ─────────────────────────────────────────────────────────────────────────────
// CLI structure
// ─────────────────────────────────────────────────────────────────────────────

/// Personal digital-activity daemon.
#[derive(Parser)]
#[command(name = "soul-agent")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Daemon base URL (for client commands).
    #[arg(long, global = true, env = "SOUL_AGENT_URL")]
    pub url: Option<String>,

    /// Path to the JSON config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the daemon.
    Start(start::StartArgs),

    /// Stop a running daemon.
    Stop,

    /// Show daemon status.
    Status,

    /// Record a note.
    Note(note::NoteArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) plus a daily-rolling JSON-ish file under the
    // state directory.
    let filter = if cli.verbose {
        "soul_agent=debug,soul_pipeline=debug,soul_producers=debug,soul_server=debug,soul_insight=debug,info"
    } else {
        "soul_agent=info,soul_pipeline=info,soul_producers=info,soul_server=info,soul_insight=info,warn"
    };

    let log_dir = soul_config::paths::log_dir();
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "soul-agent.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    let url = cli
        .url
        .clone()
        .unwrap_or_else(|| "http://127.0.0.1:8330".to_string());

    match cli.command {
        Commands::Start(args) => start::run(args, cli.config).await,
        Commands::Stop => stop::run(),
        Commands::Status => status::run(&url).await,
        Commands::Note(args) => note::run(args, &url).await,
    }
}

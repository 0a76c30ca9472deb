//! Discord purge CLI - main entry point
//!
//! Unified interface for gathering message locators and wiping them.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

use discord_purge::commands::{self, GatherArgs, WipeArgs};
use discord_purge::{logging, metrics, Settings};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "discord_purge")]
#[command(about = "Gather and delete your own Discord guild messages", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Settings file (default: discord_purge.yml if present)
    #[arg(long, env = "DISCORD_PURGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl guild search and log the user's message URLs
    Gather(GatherArgs),

    /// Delete every message listed in a log produced by `gather`
    Wipe(WipeArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Gather(_) => "gather",
            Commands::Wipe(_) => "wipe",
        }
    }

    fn verbose(&self) -> bool {
        match self {
            Commands::Gather(args) => args.verbose,
            Commands::Wipe(args) => args.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(cli.command.verbose())?;

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let loaded = match cli.config.as_deref() {
        Some(path) => Settings::load_from_file(path),
        None => Settings::load(),
    };
    let settings = match loaded {
        Ok(settings) => settings,
        Err(err) => {
            error!("Failed to load settings: {}", err);
            return Err(err.into());
        }
    };

    let command_name = cli.command.name();
    let start = Instant::now();

    let result = execute_command(settings, cli.command).await;

    metrics::record_command(command_name, start.elapsed(), result.is_ok());

    logging::log_failure(command_name, result)
}

async fn execute_command(settings: Settings, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Gather(args) => {
            let summary = commands::gather::run(settings, args.into()).await?;
            info!(
                user_id = %summary.user_id,
                "Logged {} messages from {} pages to '{}'; next offset is {}",
                summary.messages,
                summary.pages,
                summary.output.display(),
                summary.next_offset
            );
        }
        Commands::Wipe(args) => {
            let summary = commands::wipe::run(settings, args.into()).await?;
            info!(
                "Deleted {} messages ({} already gone, {} skipped)",
                summary.deleted, summary.already_gone, summary.skipped
            );
        }
    }

    Ok(())
}

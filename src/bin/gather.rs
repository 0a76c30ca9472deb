//! Crawl a guild's search results and log every message URL written by a user

use anyhow::Result;
use clap::Parser;
use discord_purge::commands::{gather, GatherArgs};
use discord_purge::{logging, Settings};

#[derive(Parser)]
#[command(name = "gather")]
#[command(about = "Log the URLs of a user's messages in a Discord guild")]
struct Cli {
    #[command(flatten)]
    args: GatherArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.args.verbose)?;

    logging::log_failure("gather", run(cli.args).await)
}

async fn run(args: GatherArgs) -> Result<()> {
    let summary = gather::run(Settings::load()?, args.into()).await?;

    println!(
        "Logged {} messages from user {} to {} (resume with --offset {})",
        summary.messages,
        summary.user_id,
        summary.output.display(),
        summary.next_offset
    );

    Ok(())
}

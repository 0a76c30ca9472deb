//! Delete every message listed in a gather log

use anyhow::Result;
use clap::Parser;
use discord_purge::commands::{wipe, WipeArgs};
use discord_purge::{logging, Settings};

#[derive(Parser)]
#[command(name = "wipe")]
#[command(about = "Delete the Discord messages listed in a message log")]
struct Cli {
    #[command(flatten)]
    args: WipeArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.args.verbose)?;

    logging::log_failure("wipe", run(cli.args).await)
}

async fn run(args: WipeArgs) -> Result<()> {
    let summary = wipe::run(Settings::load()?, args.into()).await?;

    println!(
        "\n=== Deleted {} messages ({} already gone) ===",
        summary.deleted, summary.already_gone
    );

    Ok(())
}

//! Wipe command: replay a message log and delete every message in it

use std::path::PathBuf;

use clap::Args;
use tracing::{debug, error, info};

use crate::config::{validate_token, LineOffset, Settings, WipeConfig};
use crate::delete::{delete_message, DeleteOutcome};
use crate::error::Result;
use crate::message_log::LocatorLogReader;
use crate::metrics;
use crate::session::{open_client, LogLock};

/// Command line arguments for wiping.
#[derive(Debug, Clone, Args)]
pub struct WipeArgs {
    /// Discord token, sent verbatim in the Authorization header
    #[arg(env = "DISCORD_TOKEN", hide_env_values = true)]
    pub token: String,

    /// File name for list of message urls
    pub input: PathBuf,

    /// Skip the first N lines of the log
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Preview only, no messages deleted
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl From<WipeArgs> for WipeConfig {
    fn from(args: WipeArgs) -> Self {
        WipeConfig {
            token: args.token,
            input: args.input,
            line_offset: LineOffset(args.offset),
            dry_run: args.dry_run,
            verbose: args.verbose,
        }
    }
}

/// Result of a wipe run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WipeSummary {
    /// Lines read from the log.
    pub lines: u64,
    /// Lines before the offset, plus blank lines.
    pub skipped: u64,
    pub deleted: u64,
    pub already_gone: u64,
    /// Lines that a dry run would have deleted.
    pub previewed: u64,
}

pub async fn run(settings: Settings, config: WipeConfig) -> Result<WipeSummary> {
    validate_token(&config.token)?;

    let _lock = LogLock::acquire(&config.input)?;
    info!("Reading from file '{}'", config.input.display());
    let mut reader = LocatorLogReader::open(&config.input).await?;
    let client = open_client(settings, &config.token)?;

    let mut summary = WipeSummary::default();

    while let Some(line) = reader.next_line().await? {
        summary.lines += 1;

        if line.index < config.line_offset.0 {
            if config.verbose {
                info!("Skipping offset={}", line.index);
            }
            summary.skipped += 1;
            continue;
        }

        if line.is_blank() {
            debug!(offset = line.index, "Blank line");
            summary.skipped += 1;
            continue;
        }

        let locator = line.locator()?;

        if config.dry_run {
            info!(locator = %locator, "Would delete message at offset={}", line.index);
            summary.previewed += 1;
            continue;
        }

        info!("Deleting message at offset={}", line.index);
        match delete_message(&client, &locator).await {
            Ok(DeleteOutcome::Deleted) => summary.deleted += 1,
            Ok(DeleteOutcome::AlreadyGone) => summary.already_gone += 1,
            Err(err) => {
                error!(
                    offset = line.index,
                    locator = %locator,
                    "Delete failed; rerun with --offset {} to resume",
                    line.index
                );
                return Err(err);
            }
        }
    }

    metrics::record_messages("deleted", summary.deleted);
    metrics::record_messages("already_gone", summary.already_gone);
    metrics::record_messages("skipped", summary.skipped);

    info!(
        lines = summary.lines,
        deleted = summary.deleted,
        already_gone = summary.already_gone,
        skipped = summary.skipped,
        previewed = summary.previewed,
        "No more messages found!"
    );

    Ok(summary)
}

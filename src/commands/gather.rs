//! Gather command: crawl guild search and record the user's messages
//!
//! Every matching page is appended to the message log before the next page
//! is requested, so an interrupted run can resume from the last logged
//! search offset.

use std::path::PathBuf;

use clap::Args;
use tracing::{info, warn};

use crate::config::{
    validate_snowflake, validate_token, GatherConfig, SearchOffset, Settings, UserTarget,
    PAGE_SIZE,
};
use crate::error::Result;
use crate::identity::resolve_user;
use crate::message_log::LocatorLogWriter;
use crate::metrics;
use crate::search::SearchPaginator;
use crate::session::{open_client, LogLock};

/// Command line arguments for gathering.
#[derive(Debug, Clone, Args)]
pub struct GatherArgs {
    /// Discord token, sent verbatim in the Authorization header
    #[arg(env = "DISCORD_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Guild id
    pub guild: String,

    /// User id (default is self)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Search offset to resume from, as printed by a previous run
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// File name for output (default: messages_{user}_{guild}.txt)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl From<GatherArgs> for GatherConfig {
    fn from(args: GatherArgs) -> Self {
        GatherConfig {
            token: args.token,
            guild_id: args.guild.trim().to_string(),
            user: UserTarget::from_option(args.user),
            search_offset: SearchOffset(args.offset),
            output: args.output,
            verbose: args.verbose,
        }
    }
}

/// Result of a gather run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherSummary {
    pub user_id: String,
    pub output: PathBuf,
    /// Non-empty search pages consumed.
    pub pages: u64,
    /// Locators appended to the log.
    pub messages: u64,
    /// Offset a follow-up run would start from.
    pub next_offset: SearchOffset,
}

fn validate(config: &GatherConfig) -> Result<()> {
    validate_token(&config.token)?;
    validate_snowflake("guild", &config.guild_id)?;
    if let UserTarget::Id(id) = &config.user {
        validate_snowflake("user", id)?;
    }
    if config.search_offset.0 % PAGE_SIZE != 0 {
        warn!(
            offset = %config.search_offset,
            "Offset is not a multiple of {}; pages will not line up with a previous run",
            PAGE_SIZE
        );
    }
    Ok(())
}

pub async fn run(settings: Settings, config: GatherConfig) -> Result<GatherSummary> {
    validate(&config)?;

    let client = open_client(settings, &config.token)?;
    let profile = resolve_user(&client, &config.user, &config.guild_id, config.verbose).await?;

    let output = config.output_path(&profile.id);
    info!("Writing to file '{}'", output.display());

    let _lock = LogLock::acquire(&output)?;
    let web_url = client.settings().web_url.clone();
    let mut log = LocatorLogWriter::open(&output, web_url).await?;

    let mut paginator = SearchPaginator::new(
        client,
        config.guild_id.as_str(),
        profile.id.as_str(),
        config.search_offset,
    )
    .verbose(config.verbose);

    let mut summary = GatherSummary {
        user_id: profile.id.clone(),
        output: output.clone(),
        pages: 0,
        messages: 0,
        next_offset: config.search_offset,
    };

    loop {
        // Tip: pass this offset to --offset to continue where you left off
        info!("Gathering messages with offset={}", paginator.offset());

        let Some(page) = paginator.next_page().await? else {
            break;
        };

        log.append(&page.locators).await?;
        metrics::record_messages("gathered", page.locators.len() as u64);

        summary.pages += 1;
        summary.messages = log.written();
        summary.next_offset = paginator.offset();

        info!(
            offset = %page.offset,
            scanned = page.scanned,
            matched = page.locators.len(),
            total_results = page.total_results,
            "Page saved"
        );
    }

    info!(
        pages = summary.pages,
        messages = summary.messages,
        output = %log.path().display(),
        "No more messages found!"
    );

    Ok(summary)
}

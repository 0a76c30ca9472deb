//! Configuration for the Discord API and per-run options
//!
//! Loads API settings from an optional discord_purge.yml file and holds the
//! immutable configuration records handed to the gather and wipe drivers.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default constants (fallback if discord_purge.yml not found)
pub const SETTINGS_FILE: &str = "discord_purge.yml";
pub const DEFAULT_API_URL: &str = "https://discord.com/api/v9";
pub const DEFAULT_WEB_URL: &str = "https://discord.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Results per page returned by the guild search endpoint.
pub const PAGE_SIZE: u64 = 25;

/// Wire marker for the authenticated user.
pub const SELF_MARKER: &str = "@me";

/// YAML config structures
#[derive(Debug, Deserialize)]
struct YamlConfig {
    api: Option<ApiConfig>,
}

#[derive(Debug, Deserialize)]
struct ApiConfig {
    base_url: Option<String>,
    web_url: Option<String>,
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

/// API settings shared by every request of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// REST API root, e.g. `https://discord.com/api/v9`.
    pub api_url: String,
    /// Host used to build message locator URLs.
    pub web_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            web_url: DEFAULT_WEB_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("discord_purge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Settings {
    /// Load settings from discord_purge.yml or use defaults.
    /// Environment variables take precedence over file values.
    pub fn load() -> Result<Self> {
        Self::load_first(&[
            PathBuf::from(SETTINGS_FILE),
            Path::new("..").join(SETTINGS_FILE),
        ])
    }

    /// Load the first settings file that exists among `candidates`.
    ///
    /// Defaults apply only when none of them exists; an unreadable or invalid
    /// file is an error.
    pub fn load_first(candidates: &[PathBuf]) -> Result<Self> {
        for path in candidates {
            match Self::load_from_file(path) {
                Err(Error::IoError(e)) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(Error::IoError(e)) => {
                    return Err(Error::ConfigError(format!("{}: {}", path.display(), e)))
                }
                Err(Error::ConfigError(msg)) => {
                    return Err(Error::ConfigError(format!("{}: {}", path.display(), msg)))
                }
                other => return other,
            }
        }
        Ok(Self::default().with_env_overrides())
    }

    /// Load settings from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse settings from YAML text, applying environment overrides.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let yaml: YamlConfig = serde_yaml::from_str(content)?;
        let defaults = Self::default();

        let Some(api) = yaml.api else {
            return Ok(defaults.with_env_overrides());
        };

        let settings = Self {
            api_url: api
                .base_url
                .map(resolve_placeholder)
                .unwrap_or(defaults.api_url),
            web_url: api
                .web_url
                .map(resolve_placeholder)
                .unwrap_or(defaults.web_url),
            timeout_secs: api.timeout_secs.unwrap_or(defaults.timeout_secs),
            user_agent: api
                .user_agent
                .map(resolve_placeholder)
                .unwrap_or(defaults.user_agent),
        };

        if settings.timeout_secs == 0 {
            return Err(Error::ConfigError(
                "api.timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(settings.with_env_overrides())
    }

    /// Apply DISCORD_API_URL / DISCORD_WEB_URL from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("DISCORD_API_URL") {
            self.api_url = url;
        }
        if let Ok(url) = std::env::var("DISCORD_WEB_URL") {
            self.web_url = url;
        }
        self
    }

    /// Settings pointing both API and web URLs at one base (tests, proxies).
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        let base = base_url.into();
        Self {
            api_url: format!("{}/api/v9", base.trim_end_matches('/')),
            web_url: base.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Join a path onto the API root.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Resolve a `${VAR}` placeholder from the environment, keeping the raw
/// value when the variable is unset.
fn resolve_placeholder(value: String) -> String {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        if let Ok(env_val) = std::env::var(var_name) {
            return env_val;
        }
    }
    value
}

/// Whose messages to gather.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UserTarget {
    /// The account owning the token
    #[default]
    Me,
    /// A user by snowflake id
    Id(String),
}

impl UserTarget {
    pub fn from_option(id: Option<String>) -> Self {
        match id {
            Some(id) if !id.trim().is_empty() && id.trim() != SELF_MARKER => {
                UserTarget::Id(id.trim().to_string())
            }
            _ => UserTarget::Me,
        }
    }

    /// Path segment used by the users endpoint.
    pub fn path_segment(&self) -> &str {
        match self {
            UserTarget::Me => SELF_MARKER,
            UserTarget::Id(id) => id,
        }
    }
}

/// Page cursor into the unfiltered search result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SearchOffset(pub u64);

impl SearchOffset {
    pub fn is_start(self) -> bool {
        self.0 == 0
    }

    /// Cursor of the page after this one.
    pub fn next_page(self) -> Self {
        SearchOffset(self.0 + PAGE_SIZE)
    }
}

impl fmt::Display for SearchOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero-based index over message log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct LineOffset(pub u64);

impl fmt::Display for LineOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options for a gather run.
#[derive(Debug, Clone)]
pub struct GatherConfig {
    pub token: String,
    pub guild_id: String,
    pub user: UserTarget,
    pub search_offset: SearchOffset,
    pub output: Option<PathBuf>,
    pub verbose: bool,
}

impl GatherConfig {
    /// Log path, defaulting to `messages_{user}_{guild}.txt`.
    pub fn output_path(&self, user_id: &str) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(user_id, &self.guild_id))
    }
}

/// Default message log name for a user and guild.
pub fn default_output_path(user_id: &str, guild_id: &str) -> PathBuf {
    PathBuf::from(format!("messages_{}_{}.txt", user_id, guild_id))
}

/// Options for a wipe run.
#[derive(Debug, Clone)]
pub struct WipeConfig {
    pub token: String,
    pub input: PathBuf,
    pub line_offset: LineOffset,
    pub dry_run: bool,
    pub verbose: bool,
}

/// Reject empty tokens and non-numeric ids before any request is made.
pub fn validate_token(token: &str) -> Result<()> {
    if token.trim().is_empty() {
        return Err(Error::InvalidArgument("token is empty".to_string()));
    }
    Ok(())
}

pub fn validate_snowflake(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidArgument(format!(
            "{} id must be numeric, got '{}'",
            kind, id
        )));
    }
    Ok(())
}

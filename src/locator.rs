//! Message locators: the `(guild, channel, message)` triple stored in the
//! message log as a web URL.

use std::fmt;

use crate::config::validate_snowflake;
use crate::error::{Error, Result};

/// Identifies one message for later deletion.
///
/// Ids are snowflakes kept as opaque strings; they are never parsed into
/// integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageLocator {
    pub guild_id: String,
    pub channel_id: String,
    pub message_id: String,
}

impl MessageLocator {
    pub fn new<G, C, M>(guild_id: G, channel_id: C, message_id: M) -> Self
    where
        G: Into<String>,
        C: Into<String>,
        M: Into<String>,
    {
        Self {
            guild_id: guild_id.into(),
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }

    /// Render as `{web_url}/channels/{guild}/{channel}/{message}`.
    pub fn to_url(&self, web_url: &str) -> String {
        format!(
            "{}/channels/{}/{}/{}",
            web_url.trim_end_matches('/'),
            self.guild_id,
            self.channel_id,
            self.message_id
        )
    }

    /// Parse a locator URL. Channel and message ids are the trailing two
    /// path segments and must be snowflakes; the guild id is the one before
    /// them, when that segment is numeric.
    pub fn parse(line: &str) -> Result<Self> {
        let cleaned = line.trim().trim_end_matches('/');
        let mut segments = cleaned.rsplit('/');

        let message_id = segments.next().unwrap_or_default();
        let channel_id = segments.next().unwrap_or_default();
        let guild_id = segments
            .next()
            .filter(|segment| validate_snowflake("guild", segment).is_ok())
            .unwrap_or_default();

        validate_snowflake("channel", channel_id)
            .and_then(|_| validate_snowflake("message", message_id))
            .map_err(|e| Error::InvalidLocator(format!("{}: {}", line.trim(), e)))?;

        Ok(Self::new(guild_id, channel_id, message_id))
    }
}

impl fmt::Display for MessageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.guild_id, self.channel_id, self.message_id)
    }
}

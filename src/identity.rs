//! Resolve the target user before crawling.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::info;

use crate::config::UserTarget;
use crate::error::{Error, Result};
use crate::http::RateLimitedClient;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
}

/// Look up `target` and return its profile.
///
/// A 404 becomes [`Error::NotFound`]; any other failure status is returned as
/// [`Error::Http`] without retrying.
pub async fn resolve_user(
    client: &RateLimitedClient,
    target: &UserTarget,
    guild_id: &str,
    verbose: bool,
) -> Result<UserProfile> {
    let path = format!("/users/{}", target.path_segment());
    let response = client.execute("user", client.get(&path)).await?;

    if response.status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(format!(
            "user {} does not exist",
            target.path_segment()
        )));
    }

    let profile: UserProfile = response.error_for_status()?.json()?;
    if verbose {
        info!(?profile, "Resolved user");
    }
    info!(
        user_id = %profile.id,
        "Gathering messages from @{} in guild {}",
        profile.username,
        guild_id
    );

    Ok(profile)
}

//! Single-message deletion.

use reqwest::StatusCode;
use tracing::error;

use crate::error::Result;
use crate::http::RateLimitedClient;
use crate::locator::MessageLocator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Discord answered 404: the message is already gone.
    AlreadyGone,
}

/// Delete one message. Throttling is retried by the client; a 404 counts as
/// done; any other failure status is returned as an error.
pub async fn delete_message(
    client: &RateLimitedClient,
    locator: &MessageLocator,
) -> Result<DeleteOutcome> {
    let path = format!(
        "/channels/{}/messages/{}",
        locator.channel_id, locator.message_id
    );
    let response = client.execute("delete", client.delete(&path)).await?;

    if response.status == StatusCode::NOT_FOUND {
        error!(
            channel_id = %locator.channel_id,
            message_id = %locator.message_id,
            "Message not found, skipping..."
        );
        return Ok(DeleteOutcome::AlreadyGone);
    }

    response.error_for_status()?;
    Ok(DeleteOutcome::Deleted)
}

//! Guild message search pagination.
//!
//! Walks `/guilds/{guild}/messages/search` in ascending timestamp order, 25
//! results per page, keeping only messages written by the target author.

use futures::stream::{self, Stream, TryStreamExt};
use serde::Deserialize;
use tracing::info;

use crate::config::SearchOffset;
use crate::error::{Error, Result};
use crate::http::RateLimitedClient;
use crate::locator::MessageLocator;

/// One page of search results.
///
/// `messages` holds context groups; the first envelope of each group is the
/// actual hit.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResultBundle {
    pub messages: Vec<Vec<MessageEnvelope>>,
    pub total_results: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEnvelope {
    pub id: String,
    pub channel_id: String,
    pub author: Author,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    pub id: String,
}

/// Locators for the hits written by `author_id`, in page order.
pub fn filter_author(
    bundle: &SearchResultBundle,
    guild_id: &str,
    author_id: &str,
) -> Vec<MessageLocator> {
    bundle
        .messages
        .iter()
        .filter_map(|group| group.first())
        .filter(|hit| hit.author.id == author_id)
        .map(|hit| MessageLocator::new(guild_id, hit.channel_id.as_str(), hit.id.as_str()))
        .collect()
}

/// A consumed search page.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Offset this page was requested with.
    pub offset: SearchOffset,
    pub total_results: i64,
    /// Hits on the page before author filtering.
    pub scanned: usize,
    pub locators: Vec<MessageLocator>,
}

/// Sequential crawler over a guild's search results for one author.
pub struct SearchPaginator {
    client: RateLimitedClient,
    guild_id: String,
    author_id: String,
    offset: SearchOffset,
    exhausted: bool,
    verbose: bool,
}

impl SearchPaginator {
    pub fn new(
        client: RateLimitedClient,
        guild_id: impl Into<String>,
        author_id: impl Into<String>,
        start: SearchOffset,
    ) -> Self {
        Self {
            client,
            guild_id: guild_id.into(),
            author_id: author_id.into(),
            offset: start,
            exhausted: false,
            verbose: false,
        }
    }

    /// Log raw page contents.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Offset the next request will use; resume a crawl from here.
    pub fn offset(&self) -> SearchOffset {
        self.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("author_id", self.author_id.clone()),
            ("sort_by", "timestamp".to_string()),
            ("sort_order", "asc".to_string()),
            ("include_nsfw", "true".to_string()),
        ];
        if !self.offset.is_start() {
            params.push(("offset", self.offset.to_string()));
        }
        params
    }

    /// Fetch the page at the current offset.
    ///
    /// Returns `None` once a page comes back empty or reports
    /// `total_results <= 0`; no request is made after that. The offset only
    /// advances after a page has been returned.
    pub async fn next_page(&mut self) -> Result<Option<SearchPage>> {
        if self.exhausted {
            return Ok(None);
        }

        let path = format!("/guilds/{}/messages/search", self.guild_id);
        let request = self.client.get(&path).query(&self.query());
        let bundle: SearchResultBundle = self
            .client
            .execute("search", request)
            .await?
            .error_for_status()?
            .json()?;

        if self.verbose {
            info!(offset = %self.offset, messages = ?bundle.messages, "Search page");
        }

        if bundle.messages.is_empty() || bundle.total_results <= 0 {
            self.exhausted = true;
            return Ok(None);
        }

        let page = SearchPage {
            offset: self.offset,
            total_results: bundle.total_results,
            scanned: bundle.messages.len(),
            locators: filter_author(&bundle, &self.guild_id, &self.author_id),
        };
        self.offset = self.offset.next_page();

        Ok(Some(page))
    }

    /// Lazy stream of matching locators. The next page is requested only
    /// after every locator of the current one has been consumed.
    pub fn into_stream(self) -> impl Stream<Item = Result<MessageLocator>> {
        stream::try_unfold(self, |mut paginator| async move {
            let page = paginator.next_page().await?;
            Ok::<_, Error>(page.map(|page| {
                let locators = page.locators.into_iter().map(Ok::<_, Error>);
                (stream::iter(locators), paginator)
            }))
        })
        .try_flatten()
    }
}

//! Discord REST client that absorbs rate limiting.
//!
//! Every request goes through [`RateLimitedClient::execute`]: when Discord
//! answers with a throttling signal the client sleeps for the server-provided
//! delay and re-sends the identical request. Retries are unbounded; callers
//! never observe a throttled response.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::metrics;

/// Wait applied to a 429 that carries no delay hint at all.
pub const DEFAULT_THROTTLE_DELAY: Duration = Duration::from_secs(1);

const RESET_AFTER: &str = "x-ratelimit-reset-after";

/// Fully buffered API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            Error::SerializationError(format!("unexpected response body {}: {}", self.text(), e))
        })
    }

    /// Turn a non-success response into [`Error::Http`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Http {
                status: self.status.as_u16(),
                body: self.text(),
            })
        }
    }

    fn header_secs(&self, name: impl reqwest::header::AsHeaderName) -> Option<Duration> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<f64>().ok())
            .and_then(secs_to_duration)
    }

    fn body_retry_after(&self) -> Option<Duration> {
        let value: serde_json::Value = serde_json::from_slice(&self.body).ok()?;
        value
            .get("retry_after")
            .and_then(serde_json::Value::as_f64)
            .and_then(secs_to_duration)
    }
}

fn secs_to_duration(secs: f64) -> Option<Duration> {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

/// How long to back off before re-sending, or `None` if not throttled.
///
/// A 429 takes its delay from `Retry-After`, then the body's `retry_after`,
/// then `X-RateLimit-Reset-After`, else [`DEFAULT_THROTTLE_DELAY`]. Any other
/// status is throttled only when its JSON body carries a positive
/// `retry_after`, which is how the search endpoint asks callers to wait
/// (including its "index not yet available" 202).
pub fn throttle_delay(response: &ApiResponse) -> Option<Duration> {
    if response.status == StatusCode::TOO_MANY_REQUESTS {
        return Some(
            response
                .header_secs(RETRY_AFTER)
                .or_else(|| response.body_retry_after())
                .or_else(|| response.header_secs(RESET_AFTER))
                .unwrap_or(DEFAULT_THROTTLE_DELAY),
        );
    }
    response.body_retry_after()
}

/// Authenticated HTTP session against the Discord API.
///
/// Dropping the client releases its connection pool.
#[derive(Debug, Clone)]
pub struct RateLimitedClient {
    http: Client,
    settings: Settings,
}

impl RateLimitedClient {
    /// Build a client sending `Authorization: <token>` verbatim on every request.
    pub fn new(settings: Settings, token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::InvalidArgument("token is empty".to_string()));
        }

        let mut auth = HeaderValue::from_str(token)
            .map_err(|e| Error::InvalidArgument(format!("token is not a valid header: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::ConnectionError(format!("HTTP client error: {}", e)))?;

        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.settings.endpoint(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.http.delete(self.settings.endpoint(path))
    }

    /// Send a request, sleeping and re-sending it for as long as Discord
    /// keeps throttling. `endpoint` labels logs and metrics.
    pub async fn execute(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<ApiResponse> {
        let request = request.build()?;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let pending = request.try_clone().ok_or_else(|| {
                Error::InvalidArgument(format!("{} request cannot be replayed", endpoint))
            })?;

            debug!(endpoint, attempt, method = %pending.method(), url = %pending.url(), "Sending request");
            let response = ApiResponse::read(self.http.execute(pending).await?).await?;
            metrics::record_http_response(endpoint, response.status.as_u16());

            match throttle_delay(&response) {
                Some(delay) => {
                    metrics::record_throttle(endpoint);
                    warn!(
                        endpoint,
                        attempt,
                        status = response.status.as_u16(),
                        "We are being rate limited, retrying after {:.2}s...",
                        delay.as_secs_f64()
                    );
                    sleep(delay).await;
                }
                None => return Ok(response),
            }
        }
    }
}

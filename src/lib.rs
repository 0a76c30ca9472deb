//! Discord message purger library
//!
//! This library provides tools to:
//! - Crawl a guild's message search for one author and log message locators
//! - Replay a message log and delete every message it lists
//! - Absorb Discord rate limiting transparently on every request
//! - Expose Prometheus metrics for long-running crawls and wipes

pub mod config;
pub mod delete;
pub mod error;
pub mod http;
pub mod identity;
pub mod locator;
pub mod logging;
pub mod message_log;
pub mod metrics;
pub mod search;
pub mod session;

// Re-export common types
pub use config::{GatherConfig, LineOffset, SearchOffset, Settings, UserTarget, WipeConfig};
pub use error::{Error, Result};
pub use http::RateLimitedClient;
pub use locator::MessageLocator;
pub use session::{open_client, LogLock};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;

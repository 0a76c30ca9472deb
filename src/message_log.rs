//! Append-only message log: one locator URL per line.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};

use crate::error::Result;
use crate::locator::MessageLocator;

/// Appends locators to the log, one page at a time.
pub struct LocatorLogWriter {
    path: PathBuf,
    web_url: String,
    file: File,
    written: u64,
}

impl LocatorLogWriter {
    /// Open (or create) the log in append mode.
    pub async fn open<P: AsRef<Path>>(path: P, web_url: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            web_url: web_url.into(),
            file,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines appended by this writer.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append a batch of locators and make it durable before returning.
    ///
    /// The batch goes out as a single buffer of complete lines so an
    /// interrupted run never leaves a partial line behind.
    pub async fn append(&mut self, locators: &[MessageLocator]) -> Result<()> {
        if locators.is_empty() {
            return Ok(());
        }

        let mut buffer = String::new();
        for locator in locators {
            buffer.push_str(&locator.to_url(&self.web_url));
            buffer.push('\n');
        }

        self.file.write_all(buffer.as_bytes()).await?;
        self.file.flush().await?;
        self.file.sync_data().await?;
        self.written += locators.len() as u64;
        Ok(())
    }
}

/// One line of the log with its zero-based index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub index: u64,
    pub text: String,
}

impl LogLine {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn locator(&self) -> Result<MessageLocator> {
        MessageLocator::parse(&self.text)
    }
}

/// Sequential reader over the log.
pub struct LocatorLogReader {
    lines: Lines<BufReader<File>>,
    next_index: u64,
}

impl LocatorLogReader {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            next_index: 0,
        })
    }

    /// Next line, or `None` at end of file.
    pub async fn next_line(&mut self) -> Result<Option<LogLine>> {
        let Some(text) = self.lines.next_line().await? else {
            return Ok(None);
        };
        let line = LogLine {
            index: self.next_index,
            text,
        };
        self.next_index += 1;
        Ok(Some(line))
    }
}

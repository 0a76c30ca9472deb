//! Run-scoped resources
//!
//! Provides:
//! - File-based log locking so only one run touches a message log at a time
//! - API client creation from settings and token

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, error};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::http::RateLimitedClient;

/// Lock guard giving exclusive access to a message log.
pub struct LogLock {
    path: PathBuf,
    lock_file: Option<File>,
}

impl LogLock {
    /// Lock file path for a log: `<log>.lock`.
    pub fn lock_path(log_path: &Path) -> PathBuf {
        let mut name = OsString::from(log_path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Acquire an exclusive lock on the log.
    pub fn acquire(log_path: &Path) -> Result<Self> {
        let path = Self::lock_path(log_path);
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => {
                debug!(lock = %path.display(), "Acquired message log lock");
                Ok(Self {
                    path,
                    lock_file: Some(lock_file),
                })
            }
            Err(_) => {
                error!(
                    log = %log_path.display(),
                    "Message log is already used by another run; wait for it to finish"
                );
                Err(Error::LogLocked(log_path.display().to_string()))
            }
        }
    }

    /// Release the lock manually. The lock file stays on disk so every run
    /// contends on the same inode.
    pub fn release(&mut self) {
        if let Some(file) = self.lock_file.take() {
            let _ = file.unlock();
            debug!(lock = %self.path.display(), "Released message log lock");
        }
    }
}

impl Drop for LogLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Create the API client for a run.
pub fn open_client(settings: Settings, token: &str) -> Result<RateLimitedClient> {
    RateLimitedClient::new(settings, token)
}

//! Configuration types for directory watching.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatcherError};

/// Default timeout between directory content polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for a watched directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Path to the directory to watch.
    pub path: PathBuf,

    /// Timeout between directory content polls.
    pub poll_interval: Duration,
}

impl WatchConfig {
    /// Create a new watch config with the default poll interval.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Validate that the watch target is an existing directory and the poll
    /// interval is non-zero.
    pub fn validate(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(WatcherError::DirectoryNotFound(
                self.path.display().to_string(),
            ));
        }

        if !self.path.is_dir() {
            return Err(WatcherError::NotADirectory(self.path.display().to_string()));
        }

        if self.poll_interval.is_zero() {
            return Err(WatcherError::InvalidPollInterval(self.poll_interval));
        }

        Ok(())
    }
}

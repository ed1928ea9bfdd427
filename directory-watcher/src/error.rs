//! Error types for the directory watcher.

use std::time::Duration;

use thiserror::Error;

use crate::subscriber::SubscriberId;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the directory watcher.
///
/// Every variant carries plain data, so the error that stopped a watch loop
/// can be cloned out to the owning caller through
/// [`DirectoryWatcher::last_error`](crate::watcher::DirectoryWatcher::last_error).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatcherError {
    /// Watch directory not found.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// Watch path exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Poll interval must be non-zero.
    #[error("invalid poll interval: {0:?}")]
    InvalidPollInterval(Duration),

    /// Watcher already running for this directory.
    #[error("already watching: {0}")]
    AlreadyWatching(String),

    /// Subscriber id is not registered.
    #[error("subscriber not registered: {0}")]
    SubscriberNotRegistered(SubscriberId),

    /// The watched directory disappeared while the watch loop was active.
    #[error("watch directory no longer exists: {0}")]
    WatchDirectoryLost(String),

    /// The background poll thread could not be spawned.
    #[error("failed to spawn watch thread: {0}")]
    ThreadSpawn(String),
}

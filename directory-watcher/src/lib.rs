//! # Directory Watcher
//!
//! This crate provides portable, polling-based directory monitoring. A
//! watcher periodically snapshots a directory's immediate entries, diffs the
//! snapshot against the previous one, and dispatches typed change events to
//! registered subscribers.
//!
//! ## Features
//!
//! - **Poll-and-diff detection**: no OS-native notification APIs, so behavior
//!   is identical on every platform
//! - **Typed events**: add/delete/modify, classified by file vs. directory
//! - **Filtered subscribers**: per-subscriber event-kind sets plus regex or
//!   predicate path filters
//! - **Safe lifecycle**: cooperative start/stop around one background poll
//!   thread per watcher
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Directory Watcher                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  WatchConfig ──► DirectoryWatcher ──► poll loop                 │
//! │                        │                  │                     │
//! │                        ▼                  ▼                     │
//! │                 SubscriberRegistry   Snapshot ──diff──► events  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod snapshot;
pub mod subscriber;
pub mod watcher;

pub use config::{DEFAULT_POLL_INTERVAL, WatchConfig};
pub use error::{Result, WatcherError};
pub use event::{ChangeEvent, ChangeKind};
pub use snapshot::{EntryKind, EntryRecord, Snapshot, diff};
pub use subscriber::{EventCallback, PathFilter, Subscriber, SubscriberId, SubscriberRegistry};
pub use watcher::DirectoryWatcher;

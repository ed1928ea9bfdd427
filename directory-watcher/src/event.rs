//! Change events produced by directory watching.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::EntryKind;

/// A detected change to one immediate entry of the watched directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The kind of change.
    pub kind: ChangeKind,

    /// Path to the affected file or directory.
    pub path: PathBuf,

    /// When the change was detected.
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Create a new change event stamped with the current time.
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            timestamp: Utc::now(),
        }
    }

    /// Check if this event concerns a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Check if this event concerns a directory.
    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }
}

/// Kind of change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A file appeared in the watched directory.
    FileAdded,

    /// A file's size metric changed.
    FileModified,

    /// A file disappeared from the watched directory.
    FileDeleted,

    /// A subdirectory appeared in the watched directory.
    DirectoryAdded,

    /// A subdirectory's size metric or child count changed.
    DirectoryModified,

    /// A subdirectory disappeared from the watched directory.
    DirectoryDeleted,
}

impl ChangeKind {
    /// Every change kind, in declaration order.
    pub const ALL: [ChangeKind; 6] = [
        ChangeKind::FileAdded,
        ChangeKind::FileModified,
        ChangeKind::FileDeleted,
        ChangeKind::DirectoryAdded,
        ChangeKind::DirectoryModified,
        ChangeKind::DirectoryDeleted,
    ];

    /// The added kind for the given entry type.
    pub fn added(entry: EntryKind) -> Self {
        match entry {
            EntryKind::File => Self::FileAdded,
            EntryKind::Directory => Self::DirectoryAdded,
        }
    }

    /// The modified kind for the given entry type.
    pub fn modified(entry: EntryKind) -> Self {
        match entry {
            EntryKind::File => Self::FileModified,
            EntryKind::Directory => Self::DirectoryModified,
        }
    }

    /// The deleted kind for the given entry type.
    pub fn deleted(entry: EntryKind) -> Self {
        match entry {
            EntryKind::File => Self::FileDeleted,
            EntryKind::Directory => Self::DirectoryDeleted,
        }
    }

    /// Check if this kind concerns a file.
    pub fn is_file(self) -> bool {
        matches!(
            self,
            Self::FileAdded | Self::FileModified | Self::FileDeleted
        )
    }

    /// Check if this kind concerns a directory.
    pub fn is_directory(self) -> bool {
        !self.is_file()
    }
}

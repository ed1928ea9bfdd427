//! Point-in-time snapshots of a directory's immediate entries.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::event::{ChangeEvent, ChangeKind};

/// The on-disk type of a snapshot entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A regular file (or anything that is not a directory).
    File,

    /// A directory.
    Directory,
}

/// The comparable metric recorded for one directory entry.
///
/// All comparisons are exact; there is no epsilon tolerance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// On-disk type at capture time.
    pub kind: EntryKind,

    /// Byte length reported by metadata.
    pub len: u64,

    /// Modification time, when the platform reports one.
    pub modified: Option<DateTime<Utc>>,

    /// Number of immediate children, recorded for directories.
    pub child_count: Option<usize>,
}

impl EntryRecord {
    /// Whether the size metrics differ in a way that counts as a modification.
    fn differs_from(&self, other: &EntryRecord) -> bool {
        self.len != other.len
            || self.modified != other.modified
            || self.child_count != other.child_count
    }
}

/// An immutable map of a directory's immediate entries to their size metrics,
/// captured at one poll iteration.
///
/// Snapshots are replaced wholesale each iteration, never mutated in place.
/// Entries are keyed by absolute path in a `BTreeMap`, so diffing two
/// snapshots produces events in a deterministic lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    entries: BTreeMap<PathBuf, EntryRecord>,
}

impl Snapshot {
    /// Capture the immediate (non-recursive) entries of `dir`.
    ///
    /// Entries that vanish mid-enumeration are skipped; an empty or
    /// unlistable directory yields an empty snapshot.
    pub fn capture(dir: &Path) -> Self {
        let mut entries = BTreeMap::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };

            let kind = if metadata.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };

            let child_count = match kind {
                EntryKind::Directory => fs::read_dir(entry.path())
                    .ok()
                    .map(|children| children.flatten().count()),
                EntryKind::File => None,
            };

            let record = EntryRecord {
                kind,
                len: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                child_count,
            };

            entries.insert(entry.path().to_path_buf(), record);
        }

        Self { entries }
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot recorded no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the record for a path.
    pub fn get(&self, path: &Path) -> Option<&EntryRecord> {
        self.entries.get(path)
    }

    /// Iterate over the recorded entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &EntryRecord)> {
        self.entries.iter()
    }
}

/// Compute the ordered change events between two snapshots.
///
/// Over the union of paths: present in both with a differing metric yields a
/// modification, present only in `old` a deletion, present only in `new` an
/// addition. Deletions are classified by the entry's last known type, since
/// the path may no longer exist to query; additions and modifications use the
/// type recorded when `new` was captured. A file replaced by a same-name
/// directory between snapshots therefore surfaces as a single modification of
/// the new type rather than a delete/add pair.
///
/// Pure over its inputs: the filesystem is not consulted, and events come out
/// in lexicographic path order regardless of how the snapshots were built.
pub fn diff(old: &Snapshot, new: &Snapshot) -> Vec<ChangeEvent> {
    let union: BTreeSet<&PathBuf> = old.entries.keys().chain(new.entries.keys()).collect();

    let mut events = Vec::new();
    for path in union {
        match (old.entries.get(path), new.entries.get(path)) {
            (Some(before), Some(after)) => {
                if before.differs_from(after) {
                    events.push(ChangeEvent::new(ChangeKind::modified(after.kind), path));
                }
            }
            (Some(before), None) => {
                events.push(ChangeEvent::new(ChangeKind::deleted(before.kind), path));
            }
            (None, Some(after)) => {
                events.push(ChangeEvent::new(ChangeKind::added(after.kind), path));
            }
            (None, None) => {}
        }
    }

    events
}

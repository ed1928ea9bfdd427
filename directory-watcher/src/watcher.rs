//! Directory watcher implementation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::WatchConfig;
use crate::error::{Result, WatcherError};
use crate::snapshot::{Snapshot, diff};
use crate::subscriber::{Subscriber, SubscriberId, SubscriberRegistry};

/// State shared between the owning handle and the poll-loop thread.
struct WatchShared {
    /// Whether the watcher is (or should be) running.
    watching: AtomicBool,

    /// Timeout between directory content polls, read fresh each iteration.
    poll_interval: Mutex<Duration>,

    /// The snapshot the next poll diffs against, replaced wholesale.
    baseline: Mutex<Snapshot>,

    /// Registered subscribers, dispatched in registration order.
    registry: Mutex<SubscriberRegistry>,

    /// The fatal condition that stopped the loop, queryable by the owner.
    fatal: Mutex<Option<WatcherError>>,
}

/// Lock a shared cell, recovering the guard if a prior holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Watches a directory by periodically snapshotting its immediate entries,
/// diffing against the previous snapshot, and dispatching typed change events
/// to registered subscribers.
///
/// One background thread per watcher runs the whole
/// poll → snapshot → diff → dispatch cycle; subscriber callbacks run
/// synchronously on that thread, so a slow callback stalls subsequent polls.
/// Stopping is cooperative: the loop observes the stop flag once per
/// iteration, after the current sleep-plus-processing segment completes.
pub struct DirectoryWatcher {
    /// The directory this watcher watches. Immutable after construction.
    path: PathBuf,

    /// State shared with the poll-loop thread.
    shared: Arc<WatchShared>,

    /// Join handle of the most recently spawned poll loop.
    handle: Option<JoinHandle<()>>,
}

impl DirectoryWatcher {
    /// Create a watcher for the configured directory.
    ///
    /// Validates the config but does not start polling; call
    /// [`start`](Self::start).
    pub fn new(config: WatchConfig) -> Result<Self> {
        config.validate()?;

        let shared = WatchShared {
            watching: AtomicBool::new(false),
            poll_interval: Mutex::new(config.poll_interval),
            baseline: Mutex::new(Snapshot::default()),
            registry: Mutex::new(SubscriberRegistry::new()),
            fatal: Mutex::new(None),
        };

        Ok(Self {
            path: config.path,
            shared: Arc::new(shared),
            handle: None,
        })
    }

    /// The directory this watcher watches.
    pub fn watch_dir(&self) -> &Path {
        &self.path
    }

    /// The current timeout between directory content polls.
    pub fn poll_interval(&self) -> Duration {
        *lock(&self.shared.poll_interval)
    }

    /// Set the timeout between directory content polls.
    ///
    /// Takes effect at the next sleep boundary; no restart needed.
    pub fn set_poll_interval(&self, poll_interval: Duration) -> Result<()> {
        if poll_interval.is_zero() {
            return Err(WatcherError::InvalidPollInterval(poll_interval));
        }

        *lock(&self.shared.poll_interval) = poll_interval;
        Ok(())
    }

    /// Check if the watcher is running.
    pub fn is_watching(&self) -> bool {
        self.shared.watching.load(Ordering::SeqCst)
    }

    /// The fatal condition that stopped the watch loop, if any.
    ///
    /// Cleared on the next successful [`start`](Self::start).
    pub fn last_error(&self) -> Option<WatcherError> {
        lock(&self.shared.fatal).clone()
    }

    /// Clone of the most recent snapshot of the watched directory.
    ///
    /// The loop replaces the snapshot wholesale each iteration and never
    /// mutates it in place, so reading it only contends on the swap.
    pub fn snapshot(&self) -> Snapshot {
        lock(&self.shared.baseline).clone()
    }

    /// Register a subscriber, returning the id used to remove it later.
    ///
    /// Callbacks run on the poll-loop thread while the registry is locked;
    /// registering or removing subscribers from inside a callback deadlocks.
    pub fn add_subscriber(&self, subscriber: Subscriber) -> SubscriberId {
        let id = lock(&self.shared.registry).add(subscriber);
        debug!(path = %self.path.display(), subscriber = %id, "subscriber added");
        id
    }

    /// Remove a previously registered subscriber, returning it.
    pub fn remove_subscriber(&self, id: SubscriberId) -> Result<Subscriber> {
        let subscriber = lock(&self.shared.registry).remove(id)?;
        debug!(path = %self.path.display(), subscriber = %id, "subscriber removed");
        Ok(subscriber)
    }

    /// Start watching the directory.
    ///
    /// Takes the initial snapshot synchronously, then spawns the background
    /// poll loop. Fails with [`WatcherError::AlreadyWatching`] if the watcher
    /// is running, or [`WatcherError::DirectoryNotFound`] if the directory
    /// vanished since construction. A stopped watcher may be started again.
    pub fn start(&mut self) -> Result<()> {
        if self.is_watching() {
            return Err(WatcherError::AlreadyWatching(self.path.display().to_string()));
        }

        if !self.path.is_dir() {
            return Err(WatcherError::DirectoryNotFound(
                self.path.display().to_string(),
            ));
        }

        // Wait out a defunct loop's final sleep so at most one loop ever runs.
        if let Some(previous) = self.handle.take() {
            let _ = previous.join();
        }

        *lock(&self.shared.fatal) = None;

        let initial = Snapshot::capture(&self.path);
        debug!(path = %self.path.display(), entries = initial.len(), "captured initial snapshot");
        *lock(&self.shared.baseline) = initial;

        self.shared.watching.store(true, Ordering::SeqCst);

        let path = self.path.clone();
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("directory-watcher: {}", path.display()))
            .spawn(move || run_poll_loop(&path, &shared));

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                info!(path = %self.path.display(), "directory watcher started");
                Ok(())
            }
            Err(source) => {
                self.shared.watching.store(false, Ordering::SeqCst);
                Err(WatcherError::ThreadSpawn(source.to_string()))
            }
        }
    }

    /// Stop watching. Idempotent; a no-op if already stopped.
    ///
    /// The loop observes the flag at its next iteration boundary, so the
    /// background thread may outlive this call by up to one poll interval
    /// plus processing time.
    pub fn stop(&self) {
        if self.shared.watching.swap(false, Ordering::SeqCst) {
            info!(path = %self.path.display(), "directory watcher stopping");
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the background poll thread.
///
/// Each iteration sleeps for the current poll interval, then checks for fatal
/// directory loss, snapshots, diffs against the stored baseline, dispatches
/// the resulting events in order, and stores the new snapshot.
fn run_poll_loop(path: &Path, shared: &WatchShared) {
    while shared.watching.load(Ordering::SeqCst) {
        let interval = *lock(&shared.poll_interval);
        thread::sleep(interval);

        if !path.is_dir() {
            error!(path = %path.display(), "watch directory no longer exists");
            *lock(&shared.fatal) = Some(WatcherError::WatchDirectoryLost(
                path.display().to_string(),
            ));
            break;
        }

        let current = Snapshot::capture(path);
        let events = {
            let mut baseline = lock(&shared.baseline);
            let events = diff(&baseline, &current);
            *baseline = current;
            events
        };

        if events.is_empty() {
            continue;
        }

        debug!(path = %path.display(), count = events.len(), "dispatching change events");
        let mut registry = lock(&shared.registry);
        for event in &events {
            registry.dispatch(event);
        }
    }

    shared.watching.store(false, Ordering::SeqCst);
    info!(path = %path.display(), "directory watcher stopped");
}

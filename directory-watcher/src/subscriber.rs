//! Subscribers and the registry they are dispatched through.

use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use regex::Regex;
use tracing::error;

use crate::error::{Result, WatcherError};
use crate::event::{ChangeEvent, ChangeKind};

/// Identifies a registered subscriber for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Callback invoked on the poll-loop thread for each matching event.
pub type EventCallback = Box<dyn FnMut(&ChangeEvent) + Send>;

/// Path-matching rules deciding which event paths a subscriber receives.
///
/// An unset filter accepts every path. For file events the stem, extension,
/// and full-name rules must all match where set; for directory events only
/// the directory-name rule applies. Whether a path counts as a directory
/// follows the event kind rather than a fresh filesystem probe, so deleted
/// entries filter correctly.
#[derive(Default)]
pub struct PathFilter {
    file_stem: Option<Regex>,
    file_extension: Option<Regex>,
    file_name: Option<Regex>,
    directory_name: Option<Regex>,
    predicate: Option<Box<dyn Fn(&Path) -> bool + Send>>,
}

impl PathFilter {
    /// Create a filter that accepts every path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require file events to match `regex` against the file stem
    /// (the name excluding its extension).
    pub fn with_file_stem(mut self, regex: Regex) -> Self {
        self.file_stem = Some(regex);
        self
    }

    /// Require file events to match `regex` against the extension
    /// (excluding the dot).
    pub fn with_file_extension(mut self, regex: Regex) -> Self {
        self.file_extension = Some(regex);
        self
    }

    /// Require file events to match `regex` against the full file name.
    pub fn with_file_name(mut self, regex: Regex) -> Self {
        self.file_name = Some(regex);
        self
    }

    /// Require directory events to match `regex` against the directory name.
    pub fn with_directory_name(mut self, regex: Regex) -> Self {
        self.directory_name = Some(regex);
        self
    }

    /// Require every event path to satisfy an arbitrary predicate,
    /// in addition to any regex rules.
    pub fn with_predicate(mut self, predicate: impl Fn(&Path) -> bool + Send + 'static) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Whether the filter accepts `path` for an event of `kind`.
    pub fn matches(&self, kind: ChangeKind, path: &Path) -> bool {
        if let Some(predicate) = &self.predicate {
            if !predicate(path) {
                return false;
            }
        }

        if kind.is_directory() {
            return match &self.directory_name {
                Some(regex) => component_str(path.file_name()).is_some_and(|n| regex.is_match(n)),
                None => true,
            };
        }

        if let Some(regex) = &self.file_stem {
            if !component_str(path.file_stem()).is_some_and(|n| regex.is_match(n)) {
                return false;
            }
        }

        if let Some(regex) = &self.file_extension {
            if !component_str(path.extension()).is_some_and(|n| regex.is_match(n)) {
                return false;
            }
        }

        if let Some(regex) = &self.file_name {
            if !component_str(path.file_name()).is_some_and(|n| regex.is_match(n)) {
                return false;
            }
        }

        true
    }
}

fn component_str(component: Option<&std::ffi::OsStr>) -> Option<&str> {
    component.and_then(|c| c.to_str())
}

/// A registered interested party: a set of subscribed event kinds, a path
/// filter, and a callback fired on the poll-loop thread for matching events.
///
/// Subscribers hold no watcher state; their lifetime is independent of the
/// watcher that dispatches to them.
pub struct Subscriber {
    kinds: HashSet<ChangeKind>,
    filter: PathFilter,
    callback: EventCallback,
}

impl Subscriber {
    /// Create a subscriber with no subscriptions; chain
    /// [`subscribe_to`](Self::subscribe_to) calls to pick event kinds.
    pub fn new(callback: impl FnMut(&ChangeEvent) + Send + 'static) -> Self {
        Self {
            kinds: HashSet::new(),
            filter: PathFilter::new(),
            callback: Box::new(callback),
        }
    }

    /// Subscribe to the given event kind.
    pub fn subscribe_to(mut self, kind: ChangeKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    /// Subscribe to every event kind.
    pub fn subscribe_to_all(mut self) -> Self {
        self.kinds.extend(ChangeKind::ALL);
        self
    }

    /// Set the path filter.
    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The event kinds this subscriber is subscribed to.
    pub fn subscriptions(&self) -> &HashSet<ChangeKind> {
        &self.kinds
    }

    /// Whether this subscriber should receive `event`.
    pub fn wants(&self, event: &ChangeEvent) -> bool {
        self.kinds.contains(&event.kind) && self.filter.matches(event.kind, &event.path)
    }

    fn deliver(&mut self, event: &ChangeEvent) {
        (self.callback)(event);
    }
}

/// Flat, insertion-ordered collection of subscribers.
///
/// Owned by the watcher behind a mutex; the poll-loop thread dispatches
/// through it in registration order.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: u64,
    subscribers: Vec<(SubscriberId, Subscriber)>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber, returning the id used to remove it later.
    pub fn add(&mut self, subscriber: Subscriber) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    /// Remove a previously registered subscriber, returning it.
    pub fn remove(&mut self, id: SubscriberId) -> Result<Subscriber> {
        let position = self
            .subscribers
            .iter()
            .position(|(registered, _)| *registered == id)
            .ok_or(WatcherError::SubscriberNotRegistered(id))?;

        Ok(self.subscribers.remove(position).1)
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Check if no subscribers are registered.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver `event` to every matching subscriber in registration order.
    ///
    /// A panicking callback is caught and logged per-subscriber; it never
    /// interrupts dispatch to the remaining subscribers.
    pub fn dispatch(&mut self, event: &ChangeEvent) {
        for (id, subscriber) in &mut self.subscribers {
            if !subscriber.wants(event) {
                continue;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| subscriber.deliver(event)));
            if outcome.is_err() {
                error!(
                    subscriber = %id,
                    kind = ?event.kind,
                    path = %event.path.display(),
                    "subscriber callback panicked"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(kind: ChangeKind, path: &str) -> ChangeEvent {
        ChangeEvent::new(kind, path)
    }

    #[test]
    fn test_subscriber_kind_filtering() {
        let subscriber = Subscriber::new(|_| {}).subscribe_to(ChangeKind::FileAdded);

        assert!(subscriber.wants(&event(ChangeKind::FileAdded, "/watch/a.txt")));
        assert!(!subscriber.wants(&event(ChangeKind::FileDeleted, "/watch/a.txt")));
        assert!(!subscriber.wants(&event(ChangeKind::DirectoryAdded, "/watch/sub")));
    }

    #[test]
    fn test_subscribe_to_all() {
        let subscriber = Subscriber::new(|_| {}).subscribe_to_all();
        for kind in ChangeKind::ALL {
            assert!(subscriber.wants(&event(kind, "/watch/entry")));
        }
    }

    #[test]
    fn test_unset_filter_accepts_everything() {
        let filter = PathFilter::new();
        assert!(filter.matches(ChangeKind::FileAdded, Path::new("/watch/a.txt")));
        assert!(filter.matches(ChangeKind::DirectoryDeleted, Path::new("/watch/sub")));
    }

    #[test]
    fn test_file_extension_filter() {
        let filter = PathFilter::new().with_file_extension(Regex::new("^txt$").unwrap());

        assert!(filter.matches(ChangeKind::FileAdded, Path::new("/watch/a.txt")));
        assert!(!filter.matches(ChangeKind::FileAdded, Path::new("/watch/a.log")));
        assert!(!filter.matches(ChangeKind::FileAdded, Path::new("/watch/noext")));
    }

    #[test]
    fn test_file_rules_ignored_for_directory_events() {
        let filter = PathFilter::new().with_file_extension(Regex::new("^txt$").unwrap());

        // Directory kinds only consult the directory-name rule.
        assert!(filter.matches(ChangeKind::DirectoryAdded, Path::new("/watch/sub")));
    }

    #[test]
    fn test_directory_name_filter() {
        let filter = PathFilter::new().with_directory_name(Regex::new("^build-").unwrap());

        assert!(filter.matches(ChangeKind::DirectoryAdded, Path::new("/watch/build-out")));
        assert!(!filter.matches(ChangeKind::DirectoryAdded, Path::new("/watch/src")));
    }

    #[test]
    fn test_predicate_filter() {
        let filter =
            PathFilter::new().with_predicate(|path| !path.to_string_lossy().contains("skip"));

        assert!(filter.matches(ChangeKind::FileAdded, Path::new("/watch/keep.txt")));
        assert!(!filter.matches(ChangeKind::FileAdded, Path::new("/watch/skip.txt")));
    }

    #[test]
    fn test_registry_add_remove() {
        let mut registry = SubscriberRegistry::new();
        assert!(registry.is_empty());

        let id = registry.add(Subscriber::new(|_| {}).subscribe_to_all());
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(id).is_ok());
        assert!(registry.is_empty());

        assert!(matches!(
            registry.remove(id),
            Err(WatcherError::SubscriberNotRegistered(missing)) if missing == id
        ));
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubscriberRegistry::new();

        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            registry.add(
                Subscriber::new(move |_| order.lock().unwrap().push(label)).subscribe_to_all(),
            );
        }

        registry.dispatch(&event(ChangeKind::FileAdded, "/watch/a.txt"));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_dispatch_isolates_panicking_subscriber() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let mut registry = SubscriberRegistry::new();

        registry.add(Subscriber::new(|_| panic!("subscriber bug")).subscribe_to_all());
        let counter = Arc::clone(&delivered);
        registry.add(
            Subscriber::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .subscribe_to_all(),
        );

        registry.dispatch(&event(ChangeKind::FileAdded, "/watch/a.txt"));
        registry.dispatch(&event(ChangeKind::FileDeleted, "/watch/a.txt"));

        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }
}

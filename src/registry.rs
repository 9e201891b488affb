//! Copy-on-write definition registry with change notification
//!
//! Readers take an `Arc` snapshot of the current table and keep using it for
//! the whole batch; writers hold the write lock, clone the table, modify the
//! clone and swap it in. A batch that is already running never observes a
//! registration made after it started.
//!
//! Observers are called after the write lock is released, so an observer may
//! read the registry.

use crate::error::{AnalysisError, Result};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Entries addressable by a unique id
pub trait Identified {
    fn id(&self) -> &str;
}

/// Mutation reported to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Registered(String),
    Unregistered(String),
    Replaced(String),
}

impl RegistryEvent {
    /// Id of the entry that changed
    pub fn id(&self) -> &str {
        match self {
            Self::Registered(id) | Self::Unregistered(id) | Self::Replaced(id) => id,
        }
    }
}

/// Handle returned by [`Registry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Arc<dyn Fn(&RegistryEvent) + Send + Sync>;

/// Immutable view of the registry at one point in time
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// Ordered table of definitions, in registration order
pub struct Registry<T> {
    entries: RwLock<Snapshot<T>>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
    next_subscription: AtomicU64,
}

impl<T: Identified> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(Vec::new())),
            observers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        }
    }

    /// Add a definition; ids must be unique
    pub fn register(&self, entry: T) -> Result<()> {
        let id = entry.id().to_string();
        {
            let mut entries = self.entries.write();
            if entries.iter().any(|e| e.id() == id) {
                return Err(AnalysisError::DuplicateDefinition(id));
            }
            let mut next = Vec::with_capacity(entries.len() + 1);
            next.extend(entries.iter().cloned());
            next.push(Arc::new(entry));
            *entries = Arc::new(next);
        }
        tracing::trace!(id = %id, "registered definition");
        self.notify(&RegistryEvent::Registered(id));
        Ok(())
    }

    /// Remove a definition, returning it if it was present
    pub fn unregister(&self, id: &str) -> Option<Arc<T>> {
        let removed = {
            let mut entries = self.entries.write();
            let position = entries.iter().position(|e| e.id() == id)?;
            let mut next: Vec<Arc<T>> = entries.iter().cloned().collect();
            let removed = next.remove(position);
            *entries = Arc::new(next);
            removed
        };
        tracing::trace!(id = %id, "unregistered definition");
        self.notify(&RegistryEvent::Unregistered(id.to_string()));
        Some(removed)
    }

    /// Swap the definition with the same id, keeping its position
    pub fn replace(&self, entry: T) -> Option<Arc<T>> {
        let id = entry.id().to_string();
        let previous = {
            let mut entries = self.entries.write();
            let position = entries.iter().position(|e| e.id() == id)?;
            let mut next: Vec<Arc<T>> = entries.iter().cloned().collect();
            let previous = std::mem::replace(&mut next[position], Arc::new(entry));
            *entries = Arc::new(next);
            previous
        };
        tracing::trace!(id = %id, "replaced definition");
        self.notify(&RegistryEvent::Replaced(id));
        Some(previous)
    }

    /// Rewrite the definition with `id` from its current value
    ///
    /// Read, rewrite and swap all happen under the write lock, so no other
    /// writer can slip in between. `rewrite` must keep the id. Returns the
    /// previous entry, or `None` if `id` is not registered.
    pub fn update<F>(&self, id: &str, rewrite: F) -> Result<Option<Arc<T>>>
    where
        F: FnOnce(&T) -> T,
    {
        let previous = {
            let mut entries = self.entries.write();
            let Some(position) = entries.iter().position(|e| e.id() == id) else {
                return Ok(None);
            };
            let updated = rewrite(&*entries[position]);
            if updated.id() != id {
                return Err(AnalysisError::InvalidDefinition {
                    id: id.to_string(),
                    reason: format!("update changed the id to '{}'", updated.id()),
                });
            }
            let mut next: Vec<Arc<T>> = entries.iter().cloned().collect();
            let previous = std::mem::replace(&mut next[position], Arc::new(updated));
            *entries = Arc::new(next);
            previous
        };
        tracing::trace!(id = %id, "updated definition");
        self.notify(&RegistryEvent::Replaced(id.to_string()));
        Ok(Some(previous))
    }

    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.entries.read().iter().find(|e| e.id() == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Current table; unaffected by later writes
    pub fn snapshot(&self) -> Snapshot<T> {
        Arc::clone(&self.entries.read())
    }

    /// Ids in registration order
    pub fn ids(&self) -> Vec<String> {
        self.snapshot().iter().map(|e| e.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `observer` after every successful mutation
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer; returns false if it was not subscribed
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(id, _)| *id != subscription);
        observers.len() != before
    }

    fn notify(&self, event: &RegistryEvent) {
        // Clone the list so observers run without holding the lock
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(event);
        }
    }
}

impl<T: Identified> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identified> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("ids", &self.ids())
            .field("observers", &self.observers.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, PartialEq)]
    struct Entry {
        id: String,
        value: u32,
    }

    impl Identified for Entry {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn entry(id: &str, value: u32) -> Entry {
        Entry {
            id: id.to_string(),
            value,
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = Registry::new();
        registry.register(entry("a", 1)).unwrap();
        registry.register(entry("b", 2)).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("b").unwrap().value, 2);
        assert!(registry.get("c").is_none());
        assert_eq!(registry.ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let registry = Registry::new();
        registry.register(entry("a", 1)).unwrap();
        let err = registry.register(entry("a", 2)).unwrap_err();
        assert_eq!(err, AnalysisError::DuplicateDefinition("a".to_string()));
        assert_eq!(registry.get("a").unwrap().value, 1);
    }

    #[test]
    fn test_snapshot_is_isolated_from_writes() {
        let registry = Registry::new();
        registry.register(entry("a", 1)).unwrap();
        let snapshot = registry.snapshot();

        registry.register(entry("b", 2)).unwrap();
        registry.unregister("a");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "a");
        assert_eq!(registry.ids(), vec!["b"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let registry = Registry::new();
        registry.register(entry("a", 1)).unwrap();
        registry.register(entry("b", 2)).unwrap();

        let previous = registry.replace(entry("a", 10)).unwrap();
        assert_eq!(previous.value, 1);
        assert_eq!(registry.ids(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().value, 10);
        assert!(registry.replace(entry("zz", 0)).is_none());
    }

    #[test]
    fn test_update_rewrites_in_place() {
        let registry = Registry::new();
        registry.register(entry("a", 1)).unwrap();
        registry.register(entry("b", 2)).unwrap();

        let previous = registry
            .update("a", |e: &Entry| entry(&e.id, e.value + 5))
            .unwrap()
            .unwrap();
        assert_eq!(previous.value, 1);
        assert_eq!(registry.get("a").unwrap().value, 6);
        assert_eq!(registry.ids(), vec!["a", "b"]);

        assert!(registry.update("zz", |e: &Entry| entry(&e.id, 0)).unwrap().is_none());

        let err = registry.update("a", |_| entry("renamed", 0)).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidDefinition { ref id, .. } if id == "a"));
        assert_eq!(registry.get("a").unwrap().value, 6);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let registry = Arc::new(Registry::new());
        registry.register(entry("counter", 0)).unwrap();

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        registry
                            .update("counter", |e: &Entry| entry(&e.id, e.value + 1))
                            .unwrap();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(registry.get("counter").unwrap().value, 2000);
    }

    #[test]
    fn test_unregister_missing() {
        let registry: Registry<Entry> = Registry::new();
        assert!(registry.unregister("missing").is_none());
    }

    #[test]
    fn test_observers_notified_and_unsubscribed() {
        let registry = Registry::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let subscription = registry.subscribe(move |event| sink.lock().push(event.clone()));

        registry.register(entry("a", 1)).unwrap();
        registry.replace(entry("a", 2));
        registry.unregister("a");
        // failed mutations notify nobody
        registry.unregister("a");

        assert_eq!(
            *events.lock(),
            vec![
                RegistryEvent::Registered("a".to_string()),
                RegistryEvent::Replaced("a".to_string()),
                RegistryEvent::Unregistered("a".to_string()),
            ]
        );

        assert!(registry.unsubscribe(subscription));
        assert!(!registry.unsubscribe(subscription));
        registry.register(entry("b", 1)).unwrap();
        assert_eq!(events.lock().len(), 3);
    }

    #[test]
    fn test_observer_may_read_registry() {
        let registry = Arc::new(Registry::new());
        let seen = Arc::new(AtomicUsize::new(0));

        let reader = Arc::clone(&registry);
        let counter = Arc::clone(&seen);
        registry.subscribe(move |_| {
            counter.store(reader.len(), Ordering::SeqCst);
        });

        registry.register(entry("a", 1)).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_registration_and_reads() {
        let registry = Arc::new(Registry::new());
        let writers: Vec<_> = (0..4)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        registry.register(entry(&format!("{}-{}", t, i), i)).unwrap();
                        let snapshot = registry.snapshot();
                        assert!(!snapshot.is_empty());
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(registry.len(), 200);
    }
}

//! Watch registry shared by store backends.
//!
//! # Invariants
//! - A removed watcher is never called again by a later dispatch.
//! - Dispatch happens outside the registry lock, so listeners may call back
//!   into the store.

use super::{CollectionQuery, DocPath, Document, StoreResult};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

pub type CollectionListener = Box<dyn FnMut(StoreResult<Vec<Document>>) + Send>;
pub type DocumentListener = Box<dyn FnMut(StoreResult<Option<Document>>) + Send>;

/// Live watch handle. Dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Subscription with nothing to tear down.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Stops delivery. Idempotent through drop.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum WatchTarget {
    Collection(CollectionQuery),
    Document(DocPath),
}

impl WatchTarget {
    fn collection(&self) -> &str {
        match self {
            Self::Collection(query) => query.collection.as_str(),
            Self::Document(path) => path.collection.as_str(),
        }
    }

    /// Returns whether a write to `path` changes what this target observes.
    fn is_affected_by(&self, path: &DocPath) -> bool {
        match self {
            Self::Collection(query) => query.collection == path.collection,
            Self::Document(watched) => watched == path,
        }
    }
}

pub(crate) enum ListenerSlot {
    Collection(CollectionListener),
    Document(DocumentListener),
}

/// Snapshot producer used while dispatching.
pub(crate) trait SnapshotSource {
    fn collection_snapshot(&self, query: &CollectionQuery) -> StoreResult<Vec<Document>>;
    fn document_snapshot(&self, path: &DocPath) -> StoreResult<Option<Document>>;
}

pub(crate) type SharedSlot = Arc<Mutex<ListenerSlot>>;

struct Watcher {
    target: WatchTarget,
    slot: SharedSlot,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    watchers: BTreeMap<u64, Watcher>,
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers one watcher and returns its slot plus a removal guard.
    pub(crate) fn register(
        &self,
        target: WatchTarget,
        listener: ListenerSlot,
    ) -> (SharedSlot, Subscription) {
        let slot = Arc::new(Mutex::new(listener));
        let mut inner = lock_or_recover(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.watchers.insert(
            id,
            Watcher {
                target,
                slot: Arc::clone(&slot),
            },
        );
        drop(inner);

        let weak: Weak<Mutex<RegistryInner>> = Arc::downgrade(&self.inner);
        let subscription = Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock_or_recover(&inner).watchers.remove(&id);
            }
        });
        (slot, subscription)
    }

    /// Number of live watchers.
    pub(crate) fn len(&self) -> usize {
        lock_or_recover(&self.inner).watchers.len()
    }

    fn affected(&self, path: &DocPath) -> Vec<(WatchTarget, SharedSlot)> {
        lock_or_recover(&self.inner)
            .watchers
            .values()
            .filter(|watcher| watcher.target.is_affected_by(path))
            .map(|watcher| (watcher.target.clone(), Arc::clone(&watcher.slot)))
            .collect()
    }

    /// Re-delivers fresh snapshots to every watcher affected by `path`.
    pub(crate) fn notify(&self, path: &DocPath, source: &dyn SnapshotSource) {
        for (target, slot) in self.affected(path) {
            deliver(&target, &slot, source);
        }
    }

    /// Delivers one error to every watcher on `collection` and drops them.
    ///
    /// Mirrors a remote listener being terminated by the server.
    pub(crate) fn fail_collection(&self, collection: &str, message: &str) -> usize {
        let removed: Vec<Watcher> = {
            let mut inner = lock_or_recover(&self.inner);
            let ids: Vec<u64> = inner
                .watchers
                .iter()
                .filter(|(_, watcher)| watcher.target.collection() == collection)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| inner.watchers.remove(&id))
                .collect()
        };

        for watcher in &removed {
            deliver_error(&watcher.slot, message);
        }
        removed.len()
    }
}

/// Delivers the current snapshot for `target` to one slot.
pub(crate) fn deliver(target: &WatchTarget, slot: &SharedSlot, source: &dyn SnapshotSource) {
    let mut slot = lock_or_recover(slot);
    match (&mut *slot, target) {
        (ListenerSlot::Collection(listener), WatchTarget::Collection(query)) => {
            listener(source.collection_snapshot(query));
        }
        (ListenerSlot::Document(listener), WatchTarget::Document(path)) => {
            listener(source.document_snapshot(path));
        }
        _ => log::error!("event=watch_dispatch module=store status=error error_code=slot_mismatch"),
    }
}

pub(crate) fn deliver_error(slot: &SharedSlot, message: &str) {
    let mut slot = lock_or_recover(slot);
    let error = || super::StoreError::Backend(message.to_string());
    match &mut *slot {
        ListenerSlot::Collection(listener) => listener(Err(error())),
        ListenerSlot::Document(listener) => listener(Err(error())),
    }
}

pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

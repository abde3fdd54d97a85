//! Generic live-content engine.
//!
//! # Responsibility
//! - Subscribe to one collection or singleton document per activation.
//! - Merge live snapshots with compiled-in fallbacks.
//! - Expose a render-ready `{data, loading}` state.
//!
//! # Invariants
//! - Unavailable store: fallback data, `loading == false`, no subscription.
//! - `loading` flips to `false` on the first snapshot or error and never
//!   returns to `true` for the same activation.
//! - An empty collection snapshot yields the fallback, never an empty list.
//! - Subscription errors are terminal for the activation: the subscription
//!   is released and later deliveries are ignored (no retry).
//! - Snapshots arriving after deactivation are discarded.

use crate::store::watch::lock_or_recover;
use crate::store::{
    CollectionQuery, DocPath, Document, SortDirection, StoreHandle, StoreResult, Subscription,
};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

/// Render-ready state of one live content source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncState<T> {
    pub data: T,
    pub loading: bool,
}

/// Content type stored as an ordered collection of documents.
pub trait CollectionContent: DeserializeOwned + Clone + Send + 'static {
    /// Collection name in the document store.
    const COLLECTION: &'static str;
    /// Field the store is asked to order by.
    const ORDER_FIELD: &'static str;
    const ORDER_DIRECTION: SortDirection;

    /// Fallback shown when the collection is empty or unreachable.
    fn defaults() -> Vec<Self>;

    /// Render order; applied with a stable sort after every snapshot.
    fn compare(&self, other: &Self) -> Ordering;

    fn query() -> CollectionQuery {
        CollectionQuery::new(Self::COLLECTION).ordered_by(Self::ORDER_FIELD, Self::ORDER_DIRECTION)
    }
}

/// Content type stored as one document under a fixed path.
pub trait SingletonContent: 'static {
    type Value: Clone + Send + 'static;

    fn path() -> DocPath;

    fn fallback() -> Self::Value;

    /// Maps a present or absent document to a value.
    fn from_document(document: Option<&Document>) -> Result<Self::Value, serde_json::Error>;
}

struct Shared<T> {
    state: SyncState<T>,
    active: bool,
    terminated: bool,
    revision: u64,
    subscription: Option<Subscription>,
}

impl<T> Shared<T> {
    fn accepts_delivery(&self) -> bool {
        self.active && !self.terminated
    }

    fn publish(&mut self, data: T) {
        self.state = SyncState {
            data,
            loading: false,
        };
        self.revision += 1;
    }

    /// Publishes the fallback and ends the activation.
    ///
    /// The returned subscription must be released after the lock is gone.
    fn terminate(&mut self, fallback: T) -> Option<Subscription> {
        self.publish(fallback);
        self.terminated = true;
        self.subscription.take()
    }
}

/// One activation of a live content source.
///
/// Dropping the value tears the subscription down.
pub struct LiveContent<T> {
    label: &'static str,
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T: Clone> LiveContent<T> {
    fn with_state(label: &'static str, data: T, loading: bool) -> Self {
        Self {
            label,
            shared: Arc::new(Mutex::new(Shared {
                state: SyncState { data, loading },
                active: true,
                terminated: false,
                revision: 0,
                subscription: None,
            })),
        }
    }

    fn settled(label: &'static str, data: T) -> Self {
        Self::with_state(label, data, false)
    }

    fn pending(label: &'static str, data: T) -> Self {
        Self::with_state(label, data, true)
    }

    /// Stores the subscription unless an error already ended the activation.
    fn attach(&self, subscription: Subscription) {
        let mut shared = lock_or_recover(&self.shared);
        if shared.terminated {
            drop(shared);
            subscription.unsubscribe();
            return;
        }
        shared.subscription = Some(subscription);
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> SyncState<T> {
        lock_or_recover(&self.shared).state.clone()
    }

    pub fn data(&self) -> T {
        lock_or_recover(&self.shared).state.data.clone()
    }

    pub fn is_loading(&self) -> bool {
        lock_or_recover(&self.shared).state.loading
    }

    /// Number of snapshots or errors applied so far.
    pub fn revision(&self) -> u64 {
        lock_or_recover(&self.shared).revision
    }

    /// Whether a store subscription is currently held.
    pub fn is_subscribed(&self) -> bool {
        lock_or_recover(&self.shared)
            .subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Whether a subscription error ended this activation.
    pub fn is_terminated(&self) -> bool {
        lock_or_recover(&self.shared).terminated
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Stops receiving snapshots. Equivalent to dropping.
    pub fn deactivate(self) {
        drop(self);
    }
}

impl<T> Drop for LiveContent<T> {
    fn drop(&mut self) {
        let subscription = {
            let mut shared = lock_or_recover(&self.shared);
            shared.active = false;
            shared.subscription.take()
        };
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            debug!(
                "event=sync_deactivate module=sync status=ok source={}",
                self.label
            );
        }
    }
}

/// Activates a live collection.
pub fn watch_collection<T: CollectionContent>(store: &StoreHandle) -> LiveContent<Vec<T>> {
    let label = T::COLLECTION;
    let Ok(backend) = store.store() else {
        info!("event=sync_activate module=sync status=fallback source={label} reason=store_unavailable");
        return LiveContent::settled(label, T::defaults());
    };

    let live = LiveContent::pending(label, T::defaults());
    let shared = Arc::clone(&live.shared);
    let listener = Box::new(move |snapshot: StoreResult<Vec<Document>>| {
        let mut guard = lock_or_recover(&shared);
        if !guard.accepts_delivery() {
            return;
        }
        match snapshot {
            Ok(documents) => guard.publish(merge_collection::<T>(&documents)),
            Err(err) => {
                error!("event=sync_snapshot module=sync status=error source={label} error={err}");
                let released = guard.terminate(T::defaults());
                drop(guard);
                drop(released);
            }
        }
    });

    match backend.watch_collection(T::query(), listener) {
        Ok(subscription) => {
            debug!("event=sync_activate module=sync status=ok source={label}");
            live.attach(subscription);
        }
        Err(err) => {
            error!("event=sync_activate module=sync status=error source={label} error={err}");
            let released = lock_or_recover(&live.shared).terminate(T::defaults());
            drop(released);
        }
    }
    live
}

/// Activates a live singleton document.
pub fn watch_singleton<S: SingletonContent>(store: &StoreHandle) -> LiveContent<S::Value> {
    let path = S::path();
    let label = singleton_label(&path);
    let Ok(backend) = store.store() else {
        info!("event=sync_activate module=sync status=fallback source={label} reason=store_unavailable");
        return LiveContent::settled(label, S::fallback());
    };

    let live = LiveContent::pending(label, S::fallback());
    let shared = Arc::clone(&live.shared);
    let listener = Box::new(move |snapshot: StoreResult<Option<Document>>| {
        let mut guard = lock_or_recover(&shared);
        if !guard.accepts_delivery() {
            return;
        }
        match snapshot {
            Ok(document) => {
                let data = S::from_document(document.as_ref()).unwrap_or_else(|err| {
                    warn!("event=sync_decode module=sync status=fallback source={label} error={err}");
                    S::fallback()
                });
                guard.publish(data);
            }
            Err(err) => {
                error!("event=sync_snapshot module=sync status=error source={label} error={err}");
                let released = guard.terminate(S::fallback());
                drop(guard);
                drop(released);
            }
        }
    });

    match backend.watch_document(path, listener) {
        Ok(subscription) => {
            debug!("event=sync_activate module=sync status=ok source={label}");
            live.attach(subscription);
        }
        Err(err) => {
            error!("event=sync_activate module=sync status=error source={label} error={err}");
            let released = lock_or_recover(&live.shared).terminate(S::fallback());
            drop(released);
        }
    }
    live
}

/// Decodes, orders, and applies the empty-is-default policy.
///
/// Documents that fail to decode are skipped individually.
pub fn merge_collection<T: CollectionContent>(documents: &[Document]) -> Vec<T> {
    let mut items: Vec<T> = documents
        .iter()
        .filter_map(|document| match document.decode::<T>() {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(
                    "event=sync_decode module=sync status=skipped source={} id={} error={err}",
                    T::COLLECTION,
                    document.id
                );
                None
            }
        })
        .collect();

    if items.is_empty() {
        return T::defaults();
    }
    items.sort_by(T::compare);
    items
}

fn singleton_label(path: &DocPath) -> &'static str {
    match (path.collection.as_str(), path.id.as_str()) {
        ("settings", "profile") => "settings/profile",
        ("settings", "resume") => "settings/resume",
        ("settings", "visitors") => "settings/visitors",
        _ => "singleton",
    }
}

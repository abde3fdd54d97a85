//! In-process document store.
//!
//! # Responsibility
//! - Back demo mode seeding and tests with the full store contract.
//! - Offer fault injection for offline and subscription-error paths.
//!
//! # Invariants
//! - Insertion order (`seq`) is preserved across `set` on existing ids.
//! - All mutations of one store are serialized by a single lock.

use super::watch::{
    deliver, deliver_error, lock_or_recover, ListenerRegistry, ListenerSlot, SnapshotSource,
    WatchTarget,
};
use super::{
    apply_increment, merge_fields, sort_documents, validate_segment, CollectionListener,
    CollectionQuery, DocPath, Document, DocumentListener, DocumentStore, Fields, StoreError,
    StoreResult, Subscription,
};
use std::collections::BTreeMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredDocument {
    seq: u64,
    fields: Fields,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_seq: u64,
    collections: BTreeMap<String, BTreeMap<String, StoredDocument>>,
    offline: bool,
    fail_watches: bool,
}

impl MemoryState {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn documents(&self, collection: &str) -> Vec<Document> {
        let Some(documents) = self.collections.get(collection) else {
            return Vec::new();
        };
        let mut ordered: Vec<(&String, &StoredDocument)> = documents.iter().collect();
        ordered.sort_by_key(|(_, stored)| stored.seq);
        ordered
            .into_iter()
            .map(|(id, stored)| Document::new(id.clone(), stored.fields.clone()))
            .collect()
    }

    fn document(&self, path: &DocPath) -> Option<Document> {
        self.collections
            .get(&path.collection)
            .and_then(|documents| documents.get(&path.id))
            .map(|stored| Document::new(path.id.clone(), stored.fields.clone()))
    }
}

/// Document store held entirely in memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    state: Mutex<MemoryState>,
    registry: ListenerRegistry,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            registry: ListenerRegistry::new(),
        }
    }

    /// Makes every one-shot operation fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        lock_or_recover(&self.state).offline = offline;
    }

    /// Makes new watches fail immediately with an error snapshot.
    pub fn fail_watches(&self, fail: bool) {
        lock_or_recover(&self.state).fail_watches = fail;
    }

    /// Terminates every watch on `collection` with an error.
    ///
    /// Returns the number of watches terminated.
    pub fn inject_watch_error(&self, collection: &str, message: &str) -> usize {
        self.registry.fail_collection(collection, message)
    }

    /// Number of live watches, for subscription lifecycle assertions.
    pub fn watcher_count(&self) -> usize {
        self.registry.len()
    }

    fn online_state(&self) -> StoreResult<std::sync::MutexGuard<'_, MemoryState>> {
        let state = lock_or_recover(&self.state);
        if state.offline {
            return Err(StoreError::Backend("store offline".to_string()));
        }
        Ok(state)
    }

    fn watches_fail(&self) -> bool {
        lock_or_recover(&self.state).fail_watches
    }

    fn notify(&self, path: &DocPath) {
        self.registry.notify(path, self);
    }
}

impl SnapshotSource for MemoryDocumentStore {
    fn collection_snapshot(&self, query: &CollectionQuery) -> StoreResult<Vec<Document>> {
        let mut documents = lock_or_recover(&self.state).documents(&query.collection);
        if let Some(order_by) = &query.order_by {
            sort_documents(&mut documents, order_by);
        }
        Ok(documents)
    }

    fn document_snapshot(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        Ok(lock_or_recover(&self.state).document(path))
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        path.validate()?;
        Ok(self.online_state()?.document(path))
    }

    fn list(&self, query: &CollectionQuery) -> StoreResult<Vec<Document>> {
        validate_segment(&query.collection)?;
        drop(self.online_state()?);
        self.collection_snapshot(query)
    }

    fn set(&self, path: &DocPath, fields: Fields) -> StoreResult<()> {
        path.validate()?;
        {
            let mut state = self.online_state()?;
            let existing_seq = state
                .collections
                .get(&path.collection)
                .and_then(|documents| documents.get(&path.id))
                .map(|stored| stored.seq);
            let seq = match existing_seq {
                Some(seq) => seq,
                None => state.next_seq(),
            };
            state
                .collections
                .entry(path.collection.clone())
                .or_default()
                .insert(path.id.clone(), StoredDocument { seq, fields });
        }
        self.notify(path);
        Ok(())
    }

    fn create_if_absent(&self, path: &DocPath, fields: Fields) -> StoreResult<bool> {
        path.validate()?;
        {
            let mut state = self.online_state()?;
            if state.document(path).is_some() {
                return Ok(false);
            }
            let seq = state.next_seq();
            state
                .collections
                .entry(path.collection.clone())
                .or_default()
                .insert(path.id.clone(), StoredDocument { seq, fields });
        }
        self.notify(path);
        Ok(true)
    }

    fn update(&self, path: &DocPath, fields: Fields) -> StoreResult<()> {
        path.validate()?;
        {
            let mut state = self.online_state()?;
            let stored = state
                .collections
                .get_mut(&path.collection)
                .and_then(|documents| documents.get_mut(&path.id))
                .ok_or_else(|| StoreError::NotFound(path.clone()))?;
            merge_fields(&mut stored.fields, fields);
        }
        self.notify(path);
        Ok(())
    }

    fn delete(&self, path: &DocPath) -> StoreResult<()> {
        path.validate()?;
        let removed = {
            let mut state = self.online_state()?;
            state
                .collections
                .get_mut(&path.collection)
                .and_then(|documents| documents.remove(&path.id))
                .is_some()
        };
        if removed {
            self.notify(path);
        }
        Ok(())
    }

    fn add(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        validate_segment(collection)?;
        let path = DocPath::new(collection, Uuid::new_v4().simple().to_string());
        {
            let mut state = self.online_state()?;
            let seq = state.next_seq();
            state
                .collections
                .entry(path.collection.clone())
                .or_default()
                .insert(path.id.clone(), StoredDocument { seq, fields });
        }
        self.notify(&path);
        Ok(path.id)
    }

    fn increment(
        &self,
        path: &DocPath,
        field: &str,
        delta: i64,
        also_set: Fields,
    ) -> StoreResult<()> {
        path.validate()?;
        {
            let mut state = self.online_state()?;
            let stored = state
                .collections
                .get_mut(&path.collection)
                .and_then(|documents| documents.get_mut(&path.id))
                .ok_or_else(|| StoreError::NotFound(path.clone()))?;
            apply_increment(&mut stored.fields, field, delta, also_set)?;
        }
        self.notify(path);
        Ok(())
    }

    fn watch_collection(
        &self,
        query: CollectionQuery,
        listener: CollectionListener,
    ) -> StoreResult<Subscription> {
        validate_segment(&query.collection)?;
        let target = WatchTarget::Collection(query);
        let (slot, subscription) = self
            .registry
            .register(target.clone(), ListenerSlot::Collection(listener));
        if self.watches_fail() {
            drop(subscription);
            deliver_error(&slot, "watch rejected");
            return Ok(Subscription::detached());
        }
        deliver(&target, &slot, self);
        Ok(subscription)
    }

    fn watch_document(
        &self,
        path: DocPath,
        listener: DocumentListener,
    ) -> StoreResult<Subscription> {
        path.validate()?;
        let target = WatchTarget::Document(path);
        let (slot, subscription) = self
            .registry
            .register(target.clone(), ListenerSlot::Document(listener));
        if self.watches_fail() {
            drop(subscription);
            deliver_error(&slot, "watch rejected");
            return Ok(Subscription::detached());
        }
        deliver(&target, &slot, self);
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryDocumentStore;
    use crate::store::{
        CollectionQuery, DocPath, DocumentStore, Fields, SortDirection, StoreError,
    };
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn body(value: serde_json::Value) -> Fields {
        serde_json::from_value(value).expect("object body")
    }

    #[test]
    fn set_keeps_insertion_position_of_existing_document() {
        let store = MemoryDocumentStore::new();
        store
            .set(&DocPath::new("skills", "a"), body(json!({"order": 1})))
            .unwrap();
        store
            .set(&DocPath::new("skills", "b"), body(json!({"order": 1})))
            .unwrap();
        store
            .set(&DocPath::new("skills", "a"), body(json!({"order": 1, "name": "x"})))
            .unwrap();

        let ids: Vec<String> = store
            .list(&CollectionQuery::new("skills"))
            .unwrap()
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn create_if_absent_is_first_write_wins() {
        let store = MemoryDocumentStore::new();
        let path = DocPath::new("settings", "visitors");
        assert!(store
            .create_if_absent(&path, body(json!({"totalVisitors": 1})))
            .unwrap());
        assert!(!store
            .create_if_absent(&path, body(json!({"totalVisitors": 0})))
            .unwrap());
        let doc = store.get(&path).unwrap().unwrap();
        assert_eq!(doc.fields.get("totalVisitors"), Some(&json!(1)));
    }

    #[test]
    fn update_and_increment_require_existing_document() {
        let store = MemoryDocumentStore::new();
        let path = DocPath::new("settings", "visitors");
        assert!(matches!(
            store.update(&path, Fields::new()),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.increment(&path, "totalVisitors", 1, Fields::new()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn offline_store_fails_one_shot_operations() {
        let store = MemoryDocumentStore::new();
        store.set_offline(true);
        let err = store
            .get(&DocPath::new("settings", "profile"))
            .expect_err("offline get must fail");
        assert!(matches!(err, StoreError::Backend(_)));
        store.set_offline(false);
        assert!(store.get(&DocPath::new("settings", "profile")).unwrap().is_none());
    }

    #[test]
    fn collection_watch_receives_initial_and_change_snapshots() {
        let store = MemoryDocumentStore::new();
        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = store
            .watch_collection(
                CollectionQuery::new("skills").ordered_by("order", SortDirection::Ascending),
                Box::new(move |snapshot| {
                    sink.lock().unwrap().push(snapshot.unwrap().len());
                }),
            )
            .unwrap();

        store.add("skills", body(json!({"order": 0}))).unwrap();
        store.add("education", body(json!({"order": 0}))).unwrap();
        store.add("skills", body(json!({"order": 1}))).unwrap();
        subscription.unsubscribe();
        store.add("skills", body(json!({"order": 2}))).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(store.watcher_count(), 0);
    }

    #[test]
    fn document_watch_reports_absent_then_present() {
        let store = MemoryDocumentStore::new();
        let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = store
            .watch_document(
                DocPath::new("settings", "profile"),
                Box::new(move |snapshot| {
                    sink.lock().unwrap().push(snapshot.unwrap().is_some());
                }),
            )
            .unwrap();

        store
            .set(&DocPath::new("settings", "resume"), body(json!({"url": null})))
            .unwrap();
        store
            .set(&DocPath::new("settings", "profile"), body(json!({"name": "A"})))
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
    }

    #[test]
    fn injected_watch_error_terminates_watchers() {
        let store = MemoryDocumentStore::new();
        let errors = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&errors);
        let _subscription = store
            .watch_collection(
                CollectionQuery::new("skills"),
                Box::new(move |snapshot| {
                    if snapshot.is_err() {
                        *sink.lock().unwrap() += 1;
                    }
                }),
            )
            .unwrap();

        assert_eq!(store.inject_watch_error("skills", "permission denied"), 1);
        assert_eq!(store.watcher_count(), 0);
        store.add("skills", body(json!({"order": 0}))).unwrap();
        assert_eq!(*errors.lock().unwrap(), 1);
    }
}

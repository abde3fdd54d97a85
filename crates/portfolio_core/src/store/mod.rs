//! Document store contracts and bundled backends.
//!
//! # Responsibility
//! - Define the document/collection API the rest of core talks to.
//! - Centralize "store not configured" into one `StoreHandle` check.
//! - Provide an in-process backend and a SQLite-backed backend.
//!
//! # Invariants
//! - Watches deliver a full snapshot on subscribe and after every change
//!   touching the watched target.
//! - `increment` is atomic with respect to every other write on the store.
//! - Listeners are never invoked while a store-internal lock is held.

use crate::db::DbError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

mod memory;
mod sqlite;
pub(crate) mod watch;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;
pub use watch::{CollectionListener, DocumentListener, Subscription};

/// Document body: top-level field name to JSON value.
pub type Fields = Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by document store operations.
#[derive(Debug)]
pub enum StoreError {
    /// No store is configured; callers degrade to fallback content.
    Unavailable,
    NotFound(DocPath),
    InvalidPath(String),
    /// Field exists but has the wrong type for the requested operation.
    InvalidField { field: String, message: String },
    Serialization(serde_json::Error),
    Db(DbError),
    /// Transport/backend failure (offline, injected fault, poisoned lock).
    Backend(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "document store is not configured"),
            Self::NotFound(path) => write!(f, "document not found: {path}"),
            Self::InvalidPath(value) => write!(f, "invalid document path: {value}"),
            Self::InvalidField { field, message } => {
                write!(f, "invalid field `{field}`: {message}")
            }
            Self::Serialization(err) => write!(f, "document serialization failed: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Backend(message) => write!(f, "document store failure: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialization(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Well-known location of one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath {
    pub collection: String,
    pub id: String,
}

impl DocPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Rejects empty segments and embedded separators.
    pub fn validate(&self) -> StoreResult<()> {
        validate_segment(&self.collection)?;
        validate_segment(&self.id)
    }
}

impl Display for DocPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

pub(crate) fn validate_segment(value: &str) -> StoreResult<()> {
    if value.trim().is_empty() || value.contains('/') {
        return Err(StoreError::InvalidPath(value.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Field ordering applied to a collection query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Collection read/watch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    pub collection: String,
    pub order_by: Option<OrderBy>,
}

impl CollectionQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            order_by: None,
        }
    }

    pub fn ordered_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }
}

/// One stored document with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Decodes the body into `T`, exposing the document id as field `id`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields))
    }

    /// Decodes the body into `T` without injecting the id.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

/// Serializes a value into a document body.
///
/// Fails when `value` does not serialize to a JSON object.
pub fn to_fields<T: Serialize>(value: &T) -> StoreResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::InvalidField {
            field: "<root>".to_string(),
            message: format!("expected object body, got {other}"),
        }),
    }
}

/// Stable in-place sort of documents by one field.
///
/// Missing fields sort after present ones in both directions; ties keep the
/// incoming (insertion) order.
pub fn sort_documents(documents: &mut [Document], order_by: &OrderBy) {
    documents.sort_by(|left, right| {
        compare_field(
            left.fields.get(&order_by.field),
            right.fields.get(&order_by.field),
            order_by.direction,
        )
    });
}

fn compare_field(left: Option<&Value>, right: Option<&Value>, direction: SortDirection) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left), Some(right)) => {
            let ordering = compare_values(left, right);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        }
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            let left = left.as_f64().unwrap_or(f64::NAN);
            let right = right.as_f64().unwrap_or(f64::NAN);
            left.partial_cmp(&right).unwrap_or(Ordering::Equal)
        }
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Document store with one-shot operations and live watches.
pub trait DocumentStore: Send + Sync {
    fn get(&self, path: &DocPath) -> StoreResult<Option<Document>>;

    /// Lists a collection in query order, insertion order otherwise.
    fn list(&self, query: &CollectionQuery) -> StoreResult<Vec<Document>>;

    /// Creates or fully replaces one document.
    fn set(&self, path: &DocPath, fields: Fields) -> StoreResult<()>;

    /// Writes only when the document is absent. Returns whether it wrote.
    fn create_if_absent(&self, path: &DocPath, fields: Fields) -> StoreResult<bool>;

    /// Merges `fields` into an existing document.
    fn update(&self, path: &DocPath, fields: Fields) -> StoreResult<()>;

    /// Deletes one document. Deleting an absent document succeeds.
    fn delete(&self, path: &DocPath) -> StoreResult<()>;

    /// Creates a document with a store-assigned id and returns that id.
    fn add(&self, collection: &str, fields: Fields) -> StoreResult<String>;

    /// Atomically adds `delta` to a numeric field and merges `also_set`.
    ///
    /// A missing field counts as zero. Fails with `NotFound` when the
    /// document is absent.
    fn increment(
        &self,
        path: &DocPath,
        field: &str,
        delta: i64,
        also_set: Fields,
    ) -> StoreResult<()>;

    fn watch_collection(
        &self,
        query: CollectionQuery,
        listener: CollectionListener,
    ) -> StoreResult<Subscription>;

    fn watch_document(
        &self,
        path: DocPath,
        listener: DocumentListener,
    ) -> StoreResult<Subscription>;
}

/// Capability-checked access to the configured document store.
#[derive(Clone)]
pub enum StoreHandle {
    Unavailable,
    Connected(Arc<dyn DocumentStore>),
}

impl StoreHandle {
    pub fn unavailable() -> Self {
        Self::Unavailable
    }

    pub fn connected(store: Arc<dyn DocumentStore>) -> Self {
        Self::Connected(store)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    /// Returns the store, or `StoreError::Unavailable` in demo mode.
    pub fn store(&self) -> StoreResult<&Arc<dyn DocumentStore>> {
        match self {
            Self::Connected(store) => Ok(store),
            Self::Unavailable => Err(StoreError::Unavailable),
        }
    }
}

impl Debug for StoreHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "StoreHandle::Unavailable"),
            Self::Connected(_) => write!(f, "StoreHandle::Connected"),
        }
    }
}

/// Merges `patch` into `target`, replacing top-level fields.
pub(crate) fn merge_fields(target: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

/// Applies an increment to a body in place.
pub(crate) fn apply_increment(
    fields: &mut Fields,
    field: &str,
    delta: i64,
    also_set: Fields,
) -> StoreResult<()> {
    let current = match fields.get(field) {
        None | Some(Value::Null) => 0,
        Some(Value::Number(number)) => number.as_i64().ok_or_else(|| StoreError::InvalidField {
            field: field.to_string(),
            message: "not an integer".to_string(),
        })?,
        Some(other) => {
            return Err(StoreError::InvalidField {
                field: field.to_string(),
                message: format!("expected number, got {other}"),
            })
        }
    };
    let next = current.checked_add(delta).ok_or_else(|| StoreError::InvalidField {
        field: field.to_string(),
        message: "increment overflow".to_string(),
    })?;
    merge_fields(fields, also_set);
    fields.insert(field.to_string(), Value::from(next));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        apply_increment, sort_documents, to_fields, CollectionQuery, DocPath, Document, Fields,
        SortDirection, StoreError, StoreHandle,
    };
    use serde_json::json;

    fn doc(id: &str, body: serde_json::Value) -> Document {
        let fields: Fields = serde_json::from_value(body).expect("object body");
        Document::new(id, fields)
    }

    #[test]
    fn doc_path_rejects_empty_and_nested_segments() {
        assert!(DocPath::new("settings", "profile").validate().is_ok());
        assert!(matches!(
            DocPath::new("", "profile").validate(),
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            DocPath::new("settings", "a/b").validate(),
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[test]
    fn sort_is_stable_and_puts_missing_fields_last() {
        let mut docs = vec![
            doc("a", json!({"order": 2})),
            doc("b", json!({})),
            doc("c", json!({"order": 0})),
            doc("d", json!({"order": 2})),
        ];
        let query = CollectionQuery::new("skills").ordered_by("order", SortDirection::Ascending);
        sort_documents(&mut docs, query.order_by.as_ref().expect("order"));
        let ids: Vec<&str> = docs.iter().map(|doc| doc.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "d", "b"]);
    }

    #[test]
    fn descending_sort_keeps_missing_fields_last() {
        let mut docs = vec![
            doc("old", json!({"createdAt": "2024-01-01T00:00:00Z"})),
            doc("none", json!({})),
            doc("new", json!({"createdAt": "2025-01-01T00:00:00Z"})),
        ];
        let query =
            CollectionQuery::new("projects").ordered_by("createdAt", SortDirection::Descending);
        sort_documents(&mut docs, query.order_by.as_ref().expect("order"));
        let ids: Vec<&str> = docs.iter().map(|doc| doc.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "none"]);
    }

    #[test]
    fn decode_merges_document_id() {
        #[derive(serde::Deserialize)]
        struct Named {
            id: String,
            name: String,
        }
        let named: Named = doc("x9", json!({"name": "Rust"})).decode().expect("decodes");
        assert_eq!(named.id, "x9");
        assert_eq!(named.name, "Rust");
    }

    #[test]
    fn increment_treats_missing_field_as_zero_and_rejects_strings() {
        let mut fields = Fields::new();
        apply_increment(&mut fields, "totalVisitors", 1, Fields::new()).expect("increment");
        assert_eq!(fields.get("totalVisitors"), Some(&json!(1)));

        fields.insert("label".to_string(), json!("x"));
        let err = apply_increment(&mut fields, "label", 1, Fields::new())
            .expect_err("string field must fail");
        assert!(matches!(err, StoreError::InvalidField { .. }));
    }

    #[test]
    fn to_fields_rejects_non_object_values() {
        assert!(to_fields(&json!({"a": 1})).is_ok());
        assert!(to_fields(&json!([1, 2])).is_err());
    }

    #[test]
    fn unavailable_handle_reports_unavailable() {
        let handle = StoreHandle::unavailable();
        assert!(!handle.is_available());
        assert!(matches!(handle.store(), Err(StoreError::Unavailable)));
    }
}

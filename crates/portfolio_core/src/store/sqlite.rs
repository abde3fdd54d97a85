//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist documents as JSON bodies keyed by `(collection, doc_id)`.
//! - Feed in-process watches after every committed write.
//!
//! # Invariants
//! - `seq` is assigned once on insert and never changes on replace.
//! - Read-modify-write paths (`update`, `increment`) run inside an immediate
//!   transaction.

use super::watch::{
    deliver, lock_or_recover, ListenerRegistry, ListenerSlot, SnapshotSource, WatchTarget,
};
use super::{
    apply_increment, merge_fields, sort_documents, validate_segment, CollectionListener,
    CollectionQuery, DocPath, Document, DocumentListener, DocumentStore, Fields, StoreError,
    StoreResult, Subscription,
};
use crate::db::{open_db, open_db_in_memory};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

const INSERT_SQL: &str = "INSERT INTO documents (collection, doc_id, seq, body)
    VALUES (?1, ?2, (SELECT COALESCE(MAX(seq), 0) + 1 FROM documents), ?3)";

/// Document store persisted in one SQLite database.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
    registry: ListenerRegistry,
}

impl SqliteDocumentStore {
    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            registry: ListenerRegistry::new(),
        }
    }

    fn notify(&self, path: &DocPath) {
        self.registry.notify(path, self);
    }

    fn watch(&self, target: WatchTarget, listener: ListenerSlot) -> Subscription {
        let (slot, subscription) = self.registry.register(target.clone(), listener);
        deliver(&target, &slot, self);
        subscription
    }
}

fn parse_body(raw: &str) -> StoreResult<Fields> {
    Ok(serde_json::from_str(raw)?)
}

fn encode_body(fields: &Fields) -> StoreResult<String> {
    Ok(serde_json::to_string(fields)?)
}

fn select_body(conn: &Connection, path: &DocPath) -> StoreResult<Option<String>> {
    let body = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2",
            params![path.collection, path.id],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(body)
}

fn write_body(conn: &Connection, path: &DocPath, body: &str) -> StoreResult<()> {
    conn.execute(
        "UPDATE documents
         SET body = ?3, updated_at = CAST(strftime('%s', 'now') AS INTEGER) * 1000
         WHERE collection = ?1 AND doc_id = ?2",
        params![path.collection, path.id, body],
    )?;
    Ok(())
}

impl SnapshotSource for SqliteDocumentStore {
    fn collection_snapshot(&self, query: &CollectionQuery) -> StoreResult<Vec<Document>> {
        let conn = lock_or_recover(&self.conn);
        let mut stmt = conn.prepare(
            "SELECT doc_id, body FROM documents WHERE collection = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![query.collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, body) = row?;
            match parse_body(&body) {
                Ok(fields) => documents.push(Document::new(id, fields)),
                Err(err) => warn!(
                    "event=store_snapshot module=store status=skipped collection={} id={id} error={err}",
                    query.collection
                ),
            }
        }
        if let Some(order_by) = &query.order_by {
            sort_documents(&mut documents, order_by);
        }
        Ok(documents)
    }

    fn document_snapshot(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        let conn = lock_or_recover(&self.conn);
        match select_body(&conn, path)? {
            Some(body) => Ok(Some(Document::new(path.id.clone(), parse_body(&body)?))),
            None => Ok(None),
        }
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        path.validate()?;
        self.document_snapshot(path)
    }

    fn list(&self, query: &CollectionQuery) -> StoreResult<Vec<Document>> {
        validate_segment(&query.collection)?;
        self.collection_snapshot(query)
    }

    fn set(&self, path: &DocPath, fields: Fields) -> StoreResult<()> {
        path.validate()?;
        let body = encode_body(&fields)?;
        {
            let conn = lock_or_recover(&self.conn);
            conn.execute(
                &format!(
                    "{INSERT_SQL}
                     ON CONFLICT (collection, doc_id) DO UPDATE SET
                        body = excluded.body,
                        updated_at = CAST(strftime('%s', 'now') AS INTEGER) * 1000"
                ),
                params![path.collection, path.id, body],
            )?;
        }
        self.notify(path);
        Ok(())
    }

    fn create_if_absent(&self, path: &DocPath, fields: Fields) -> StoreResult<bool> {
        path.validate()?;
        let body = encode_body(&fields)?;
        let inserted = {
            let conn = lock_or_recover(&self.conn);
            conn.execute(
                &format!("{INSERT_SQL} ON CONFLICT (collection, doc_id) DO NOTHING"),
                params![path.collection, path.id, body],
            )?
        };
        if inserted == 0 {
            return Ok(false);
        }
        self.notify(path);
        Ok(true)
    }

    fn update(&self, path: &DocPath, fields: Fields) -> StoreResult<()> {
        path.validate()?;
        {
            let mut conn = lock_or_recover(&self.conn);
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let raw = select_body(&tx, path)?.ok_or_else(|| StoreError::NotFound(path.clone()))?;
            let mut body = parse_body(&raw)?;
            merge_fields(&mut body, fields);
            write_body(&tx, path, &encode_body(&body)?)?;
            tx.commit()?;
        }
        self.notify(path);
        Ok(())
    }

    fn delete(&self, path: &DocPath) -> StoreResult<()> {
        path.validate()?;
        let removed = {
            let conn = lock_or_recover(&self.conn);
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![path.collection, path.id],
            )?
        };
        if removed > 0 {
            self.notify(path);
        }
        Ok(())
    }

    fn add(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        validate_segment(collection)?;
        let path = DocPath::new(collection, Uuid::new_v4().simple().to_string());
        let body = encode_body(&fields)?;
        {
            let conn = lock_or_recover(&self.conn);
            conn.execute(INSERT_SQL, params![path.collection, path.id, body])?;
        }
        debug!(
            "event=doc_add module=store status=ok collection={} id={}",
            path.collection, path.id
        );
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
            let mut conn = lock_or_recover(&self.conn);
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let raw = select_body(&tx, path)?.ok_or_else(|| StoreError::NotFound(path.clone()))?;
            let mut body = parse_body(&raw)?;
            apply_increment(&mut body, field, delta, also_set)?;
            write_body(&tx, path, &encode_body(&body)?)?;
            tx.commit()?;
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
        Ok(self.watch(
            WatchTarget::Collection(query),
            ListenerSlot::Collection(listener),
        ))
    }

    fn watch_document(
        &self,
        path: DocPath,
        listener: DocumentListener,
    ) -> StoreResult<Subscription> {
        path.validate()?;
        Ok(self.watch(WatchTarget::Document(path), ListenerSlot::Document(listener)))
    }
}

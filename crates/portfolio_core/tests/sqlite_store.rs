use portfolio_core::db::migrations::latest_version;
use portfolio_core::db::{open_db, open_db_in_memory, DbError};
use portfolio_core::store::{CollectionQuery, Fields, SortDirection};
use portfolio_core::{
    watch_collection, DocPath, Document, DocumentStore, Skill, SqliteDocumentStore, StoreError,
    StoreHandle,
};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn fields(value: serde_json::Value) -> Fields {
    serde_json::from_value(value).unwrap()
}

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'documents')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        SqliteDocumentStore::open(&path),
        Err(StoreError::Db(DbError::UnsupportedSchemaVersion { .. }))
    ));
}

#[test]
fn stamped_version_without_documents_table_is_a_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stamped.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::SchemaMismatch(detail) => assert!(detail.contains("documents")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_parent_directory_reports_open_failure_with_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("site.sqlite3");
    match open_db(&path).unwrap_err() {
        DbError::Open { target, .. } => assert_eq!(target, path.display().to_string()),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn documents_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.sqlite3");

    let store = SqliteDocumentStore::open(&path).unwrap();
    let id = store
        .add("skills", fields(json!({"name": "Rust", "category": "Core", "order": 0})))
        .unwrap();
    drop(store);

    let reopened = SqliteDocumentStore::open(&path).unwrap();
    let document = reopened.get(&DocPath::new("skills", &id)).unwrap().unwrap();
    assert_eq!(document.fields["name"], json!("Rust"));
}

#[test]
fn replace_keeps_insertion_position_and_update_merges() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    for id in ["a", "b", "c"] {
        store
            .set(&DocPath::new("skills", id), fields(json!({"name": id, "order": 0})))
            .unwrap();
    }
    store
        .set(&DocPath::new("skills", "a"), fields(json!({"name": "A2", "order": 0})))
        .unwrap();
    store
        .update(&DocPath::new("skills", "b"), fields(json!({"category": "Tools"})))
        .unwrap();

    let documents = store
        .list(&CollectionQuery::new("skills").ordered_by("order", SortDirection::Ascending))
        .unwrap();
    let ids: Vec<&str> = documents.iter().map(|doc| doc.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(documents[0].fields["name"], json!("A2"));
    assert_eq!(documents[1].fields["name"], json!("b"));
    assert_eq!(documents[1].fields["category"], json!("Tools"));
}

#[test]
fn create_if_absent_and_increment_follow_store_contract() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let path = DocPath::new("settings", "visitors");

    assert!(matches!(
        store.increment(&path, "totalVisitors", 1, Fields::new()),
        Err(StoreError::NotFound(_))
    ));
    assert!(store
        .create_if_absent(&path, fields(json!({"totalVisitors": 1})))
        .unwrap());
    assert!(!store
        .create_if_absent(&path, fields(json!({"totalVisitors": 100})))
        .unwrap());

    store
        .increment(
            &path,
            "totalVisitors",
            2,
            fields(json!({"lastVisit": "2025-06-01T00:00:00Z"})),
        )
        .unwrap();
    let body = store.get(&path).unwrap().unwrap().fields;
    assert_eq!(body["totalVisitors"], json!(3));
    assert_eq!(body["lastVisit"], json!("2025-06-01T00:00:00Z"));
}

#[test]
fn delete_is_idempotent_and_paths_are_validated() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    store.delete(&DocPath::new("skills", "missing")).unwrap();
    assert!(matches!(
        store.get(&DocPath::new("skills", "a/b")),
        Err(StoreError::InvalidPath(_))
    ));
}

#[test]
fn watches_see_every_committed_write() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = store
        .watch_collection(
            CollectionQuery::new("skills"),
            Box::new(move |snapshot: Result<Vec<Document>, StoreError>| {
                sink.lock().unwrap().push(snapshot.unwrap().len());
            }),
        )
        .unwrap();

    let id = store
        .add("skills", fields(json!({"name": "Rust", "category": "Core"})))
        .unwrap();
    store.add("education", fields(json!({"degree": "BSc"}))).unwrap();
    store.delete(&DocPath::new("skills", &id)).unwrap();
    drop(subscription);
    store
        .add("skills", fields(json!({"name": "Go", "category": "Core"})))
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 0]);
}

#[test]
fn live_content_reads_through_sqlite_backend() {
    let store = Arc::new(SqliteDocumentStore::open_in_memory().unwrap());
    store
        .add("skills", fields(json!({"name": "Rust", "category": "Core", "order": 1})))
        .unwrap();
    store
        .add("skills", fields(json!({"name": "SQL", "category": "Core", "order": 0})))
        .unwrap();

    let handle = StoreHandle::connected(store as Arc<dyn DocumentStore>);
    let skills = watch_collection::<Skill>(&handle);
    let names: Vec<String> = skills.data().into_iter().map(|skill| skill.name).collect();
    assert_eq!(names, vec!["SQL", "Rust"]);
}

#[test]
fn corrupt_row_is_skipped_without_hiding_valid_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.sqlite3");
    let store = Arc::new(SqliteDocumentStore::open(&path).unwrap());
    store
        .add("skills", fields(json!({"name": "Rust", "category": "Core", "order": 0})))
        .unwrap();

    let raw = Connection::open(&path).unwrap();
    raw.execute(
        "INSERT INTO documents (collection, doc_id, seq, body) VALUES ('skills', 'broken', 99, '{not json')",
        [],
    )
    .unwrap();
    drop(raw);

    let documents = store.list(&CollectionQuery::new("skills")).unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].fields["name"], json!("Rust"));

    let handle = StoreHandle::connected(store as Arc<dyn DocumentStore>);
    let skills = watch_collection::<Skill>(&handle);
    let names: Vec<String> = skills.data().into_iter().map(|skill| skill.name).collect();
    assert_eq!(names, vec!["Rust"]);
    assert!(skills.is_subscribed());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

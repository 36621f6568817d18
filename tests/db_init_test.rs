use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tulip::cache::kv::{KeyValueStore, SqliteKvStore};
use tulip::db;

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("tulip.db");

    assert!(!db_path.exists());

    let conn = db::open_database(&db_path).unwrap();

    assert!(db_path.exists());

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM journal_entries", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn open_enables_wal() {
    let tmp = TempDir::new().unwrap();
    let conn = db::open_database(tmp.path().join("tulip.db")).unwrap();

    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[test]
fn cache_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("tulip.db");

    {
        let conn = db::open_database(&db_path).unwrap();
        let store = SqliteKvStore::new(Arc::new(Mutex::new(conn)));
        store.set("insight_themes_cache", "{\"x\":1}").unwrap();
    }

    let conn = db::open_database(&db_path).unwrap();
    let store = SqliteKvStore::new(Arc::new(Mutex::new(conn)));
    assert_eq!(
        store.get("insight_themes_cache").unwrap().as_deref(),
        Some("{\"x\":1}")
    );
}

#[test]
fn reopening_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("tulip.db");

    drop(db::open_database(&db_path).unwrap());
    let conn = db::open_database(&db_path).unwrap();

    assert_eq!(
        db::migrations::get_schema_version(&conn).unwrap(),
        db::migrations::CURRENT_SCHEMA_VERSION
    );
}

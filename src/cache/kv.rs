//! String key-value storage behind the insight cache.
//!
//! [`KeyValueStore`] is the narrow contract the cache needs. [`SqliteKvStore`]
//! persists into the `kv_store` table of the Tulip database;
//! [`MemoryKvStore`] keeps everything in a map for tests and one-off runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

/// Per-key atomic string storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove all of `keys`; missing keys are ignored.
    fn multi_remove(&self, keys: &[&str]) -> Result<()>;
}

/// Key-value store backed by the `kv_store` table.
#[derive(Clone)]
pub struct SqliteKvStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteKvStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

impl KeyValueStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self
            .db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self
            .db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn multi_remove(&self, keys: &[&str]) -> Result<()> {
        let mut conn = self
            .db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
        let tx = conn.transaction()?;
        for key in keys {
            tx.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// In-process key-value store.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("kv lock poisoned: {e}"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("kv lock poisoned: {e}"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn multi_remove(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("kv lock poisoned: {e}"))?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_store() -> SqliteKvStore {
        let conn = crate::db::open_memory_database().unwrap();
        SqliteKvStore::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn sqlite_set_get_overwrite() {
        let store = sqlite_store();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn sqlite_multi_remove_ignores_missing_keys() {
        let store = sqlite_store();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.set("c", "3").unwrap();

        store.multi_remove(&["a", "b", "never-set"]).unwrap();

        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(store.get("c").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn memory_store_behaves_like_sqlite() {
        let store = MemoryKvStore::new();
        assert!(store.is_empty());
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.multi_remove(&["a"]).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);
    }
}

//! Key-value stores backing the gallery cache.
//!
//! Two implementations:
//! - [`SqliteStore`]: persistent, one table in a SQLite file
//! - [`MemoryStore`]: process-lifetime, lock-free map
//!
//! Both can be given a byte quota. Writes that would exceed it fail with
//! [`StoreError::QuotaExceeded`], the same way browser storage does.

use std::path::Path;
use std::sync::Mutex;

use dashmap::DashMap;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// Errors returned by a store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage quota exceeded ({needed} bytes needed, {quota} allowed)")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// String key-value persistence.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    /// All keys currently stored, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
    fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys()
    }
}

impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
    fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys()
    }
}

fn check_quota(quota: Option<usize>, used: usize, key: &str, value: &str) -> Result<(), StoreError> {
    match quota {
        Some(quota) => {
            let needed = used + key.len() + value.len();
            if needed > quota {
                Err(StoreError::QuotaExceeded { needed, quota })
            } else {
                Ok(())
            }
        }
        None => Ok(()),
    }
}

/// In-memory store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total bytes of keys plus values.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: DashMap::new(),
            quota: Some(quota),
        }
    }

    fn used_bytes_excluding(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.key() != key)
            .map(|e| e.key().len() + e.value().len())
            .sum()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.quota.is_some() {
            check_quota(self.quota, self.used_bytes_excluding(key), key, value)?;
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.iter().map(|e| e.key().clone()).collect())
    }
}

/// Returns the current Unix timestamp in seconds.
fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    quota: Option<usize>,
}

impl SqliteStore {
    /// Open or create the store at `path`, creating parent directories and
    /// the schema as needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Store that lives only as long as this value.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            quota: None,
        })
    }

    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock();
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock();

        if self.quota.is_some() {
            let used: i64 = conn.query_row(
                "SELECT COALESCE(SUM(LENGTH(key) + LENGTH(value)), 0) FROM kv WHERE key != ?1",
                params![key],
                |row| row.get(0),
            )?;
            check_quota(self.quota, used.max(0) as usize, key, value)?;
        }

        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value, now_unix()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT key FROM kv")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<String>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exercise(store: &dyn KvStore) {
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.set("a", "3").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("3"));

        let mut keys = store.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        store.remove("a").unwrap();
    }

    #[test]
    fn memory_store_basic_operations() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn sqlite_store_basic_operations() {
        exercise(&SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn sqlite_store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("k", "v").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn memory_store_enforces_quota() {
        let store = MemoryStore::with_quota(10);
        store.set("ab", "1234").unwrap();

        let err = store.set("cd", "123456").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { needed: 14, quota: 10 }));

        // Replacing an existing key only counts the new value.
        store.set("ab", "12345678").unwrap();
    }

    #[test]
    fn sqlite_store_enforces_quota() {
        let store = SqliteStore::open_in_memory().unwrap().with_quota(8);
        store.set("k", "1234").unwrap();
        assert!(matches!(
            store.set("j", "12345"),
            Err(StoreError::QuotaExceeded { .. })
        ));
        assert_eq!(store.get("j").unwrap(), None);
    }
}

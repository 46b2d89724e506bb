//! SQLite-backed document store.
//!
//! Every collection shares one `documents` table; each row holds a JSON
//! document. Field transforms run inside a single transaction so counters and
//! array edits never lose concurrent writes from the same process.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::broadcast;

use super::data_dir;
use super::document::{
    apply_updates, merge_into, run_query, ChangeEvent, ChangeKind, Document, DocumentStore,
    FieldUpdate, Query,
};
use super::migrations;
use crate::error::{CoreError, Result, StorageError};

const CHANNEL_CAPACITY: usize = 256;

/// SQLite document store.
///
/// Writes are broadcast to [`DocumentStore::watch`] subscribers of this
/// handle only; other processes sharing the file are not observed.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl SqliteStore {
    /// Open the database at `<data dir>/dopamine.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open_default() -> Result<Self> {
        let path = data_dir()?.join("dopamine.db");
        Self::open(&path)
    }

    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::with_connection(conn, Some(path.to_path_buf()))
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        tracing::debug!(path = ?path, "document store ready");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
            changes,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection lock poisoned".into()).into())
    }

    fn publish(&self, collection: &str, id: &str, kind: ChangeKind) {
        let _ = self.changes.send(ChangeEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind,
        });
    }

    fn read_row(conn: &Connection, collection: &str, id: &str) -> Result<Option<Value>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(text) => Ok(Some(parse(collection, id, &text)?)),
            None => Ok(None),
        }
    }

    fn write_row(conn: &Connection, collection: &str, id: &str, doc: &Value) -> Result<()> {
        conn.execute(
            "INSERT INTO documents (collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![collection, id, doc.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn apply(&self, collection: &str, id: &str, updates: &[FieldUpdate], create: bool) -> Result<Value> {
        let doc = {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;
            let mut doc = match Self::read_row(&tx, collection, id)? {
                Some(existing) => existing,
                None if create => Value::Object(Default::default()),
                None => return Err(CoreError::not_found("document", format!("{collection}/{id}"))),
            };
            apply_updates(&mut doc, updates)?;
            Self::write_row(&tx, collection, id, &doc)?;
            tx.commit()?;
            doc
        };
        tracing::debug!(collection, id, fields = updates.len(), "document updated");
        self.publish(collection, id, ChangeKind::Upserted);
        Ok(doc)
    }
}

fn parse(collection: &str, id: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| {
        StorageError::Decode {
            collection: collection.to_string(),
            id: id.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

impl DocumentStore for SqliteStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let conn = self.conn()?;
        Self::read_row(&conn, collection, id)
    }

    fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let rows: Vec<(String, String)> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare("SELECT id, data FROM documents WHERE collection = ?1")?;
            let mapped = stmt.query_map(params![collection], |row| Ok((row.get(0)?, row.get(1)?)))?;
            mapped.collect::<std::result::Result<_, _>>()?
        };

        let docs = rows
            .into_iter()
            .map(|(id, text)| {
                let data = parse(collection, &id, &text)?;
                Ok(Document { id, data })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(run_query(docs, query))
    }

    fn set(&self, collection: &str, id: &str, doc: Value, merge: bool) -> Result<()> {
        {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;
            let doc = match (merge, Self::read_row(&tx, collection, id)?) {
                (true, Some(mut existing)) => {
                    merge_into(&mut existing, doc);
                    existing
                }
                _ => doc,
            };
            Self::write_row(&tx, collection, id, &doc)?;
            tx.commit()?;
        }
        tracing::debug!(collection, id, merge, "document written");
        self.publish(collection, id, ChangeKind::Upserted);
        Ok(())
    }

    fn update(&self, collection: &str, id: &str, updates: &[FieldUpdate]) -> Result<Value> {
        self.apply(collection, id, updates, false)
    }

    fn upsert(&self, collection: &str, id: &str, updates: &[FieldUpdate]) -> Result<Value> {
        self.apply(collection, id, updates, true)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let removed = {
            let conn = self.conn()?;
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )? > 0
        };
        if removed {
            tracing::debug!(collection, id, "document deleted");
            self.publish(collection, id, ChangeKind::Deleted);
        }
        Ok(removed)
    }

    fn watch(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::document::{DocumentStoreExt, Filter, OrderBy};
    use serde_json::json;

    #[test]
    fn set_and_get_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("carts", "u1", &json!({"userId": "u1", "items": []})).unwrap();
        let doc = store.get("carts", "u1").unwrap().unwrap();
        assert_eq!(doc["userId"], "u1");
        assert!(store.get("carts", "missing").unwrap().is_none());
    }

    #[test]
    fn merge_set_keeps_other_fields() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("users", "u", &json!({"name": "A", "email": "a@x"})).unwrap();
        store.set("users", "u", json!({"name": "B"}), true).unwrap();
        assert_eq!(store.get("users", "u").unwrap().unwrap(), json!({"name": "B", "email": "a@x"}));
    }

    #[test]
    fn update_applies_transforms_in_one_transaction() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert("users", "u", &[FieldUpdate::increment("statistics.totalMinutes", 10)])
            .unwrap();
        let doc = store
            .update(
                "users",
                "u",
                &[
                    FieldUpdate::increment("statistics.totalMinutes", 5),
                    FieldUpdate::maximum("statistics.longestStreak", 3),
                ],
            )
            .unwrap();
        assert_eq!(doc["statistics"]["totalMinutes"], 15);
        assert_eq!(doc["statistics"]["longestStreak"], 3);
    }

    #[test]
    fn failed_transform_leaves_document_unchanged() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("users", "u", &json!({"name": "A"})).unwrap();
        let result = store.update(
            "users",
            "u",
            &[FieldUpdate::set("email", "a@x"), FieldUpdate::increment("name", 1)],
        );
        assert!(result.is_err());
        assert_eq!(store.get("users", "u").unwrap().unwrap(), json!({"name": "A"}));
    }

    #[test]
    fn query_filters_and_orders() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("orders", "a", &json!({"userId": "u", "createdAt": "2025-01-01T00:00:00Z"})).unwrap();
        store.put("orders", "b", &json!({"userId": "u", "createdAt": "2025-01-02T00:00:00Z"})).unwrap();
        store.put("orders", "c", &json!({"userId": "v", "createdAt": "2025-01-03T00:00:00Z"})).unwrap();

        let docs = store
            .query(
                "orders",
                &Query::new()
                    .filter(Filter::eq("userId", "u"))
                    .order_by(OrderBy::desc("createdAt")),
            )
            .unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn reopening_file_keeps_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dopamine.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.put("menu", "categories", &json!({"starters": {"order": 1}})).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get("menu", "categories").unwrap().is_some());
        assert_eq!(store.path(), Some(path.as_path()));
    }
}

//! In-process document store.
//!
//! Used by tests and by callers that do not need persistence. Supports
//! injecting read/write failures per collection so fallback and compensation
//! paths can be exercised.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::broadcast;

use super::document::{
    apply_updates, merge_into, run_query, ChangeEvent, ChangeKind, Document, DocumentStore,
    FieldUpdate, Query,
};
use crate::error::{CoreError, Result, StorageError};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
struct Faults {
    reads: HashMap<String, Option<usize>>,
    writes: HashMap<String, Option<usize>>,
}

impl Faults {
    /// Consume one injected failure for `collection`, if any is armed.
    fn trip(table: &mut HashMap<String, Option<usize>>, collection: &str) -> bool {
        match table.get_mut(collection) {
            None => false,
            Some(None) => true,
            Some(Some(0)) => {
                table.remove(collection);
                false
            }
            Some(Some(remaining)) => {
                *remaining -= 1;
                if *remaining == 0 {
                    table.remove(collection);
                }
                true
            }
        }
    }
}

pub struct MemoryStore {
    docs: Mutex<BTreeMap<(String, String), Value>>,
    faults: Mutex<Faults>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            docs: Mutex::new(BTreeMap::new()),
            faults: Mutex::new(Faults::default()),
            changes,
        }
    }

    /// Make reads of `collection` fail. `times = None` fails until [`heal`];
    /// `Some(0)` disarms.
    ///
    /// [`heal`]: MemoryStore::heal
    pub fn fail_reads(&self, collection: &str, times: Option<usize>) {
        if let Ok(mut faults) = self.faults.lock() {
            Self::arm(&mut faults.reads, collection, times);
        }
    }

    /// Make writes to `collection` fail. `times = None` fails until [`heal`];
    /// `Some(0)` disarms.
    ///
    /// [`heal`]: MemoryStore::heal
    pub fn fail_writes(&self, collection: &str, times: Option<usize>) {
        if let Ok(mut faults) = self.faults.lock() {
            Self::arm(&mut faults.writes, collection, times);
        }
    }

    fn arm(table: &mut HashMap<String, Option<usize>>, collection: &str, times: Option<usize>) {
        match times {
            Some(0) => {
                table.remove(collection);
            }
            _ => {
                table.insert(collection.to_string(), times);
            }
        }
    }

    pub fn heal(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            *faults = Faults::default();
        }
    }

    pub fn len(&self, collection: &str) -> usize {
        self.docs
            .lock()
            .map(|docs| docs.keys().filter(|(c, _)| c == collection).count())
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<(String, String), Value>>> {
        self.docs
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()).into())
    }

    fn check_read(&self, collection: &str) -> Result<()> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| StorageError::Unavailable("fault table lock poisoned".into()))?;
        if Faults::trip(&mut faults.reads, collection) {
            return Err(StorageError::Unavailable(format!("injected read failure on {collection}")).into());
        }
        Ok(())
    }

    fn check_write(&self, collection: &str) -> Result<()> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| StorageError::Unavailable("fault table lock poisoned".into()))?;
        if Faults::trip(&mut faults.writes, collection) {
            return Err(StorageError::Unavailable(format!("injected write failure on {collection}")).into());
        }
        Ok(())
    }

    fn publish(&self, collection: &str, id: &str, kind: ChangeKind) {
        // No receivers is not an error.
        let _ = self.changes.send(ChangeEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind,
        });
    }

    fn apply(&self, collection: &str, id: &str, updates: &[FieldUpdate], create: bool) -> Result<Value> {
        self.check_write(collection)?;
        let doc = {
            let mut docs = self.lock()?;
            let key = (collection.to_string(), id.to_string());
            let mut doc = match docs.get(&key) {
                Some(existing) => existing.clone(),
                None if create => Value::Object(Default::default()),
                None => return Err(CoreError::not_found("document", format!("{collection}/{id}"))),
            };
            apply_updates(&mut doc, updates)?;
            docs.insert(key, doc.clone());
            doc
        };
        self.publish(collection, id, ChangeKind::Upserted);
        Ok(doc)
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.check_read(collection)?;
        let docs = self.lock()?;
        Ok(docs.get(&(collection.to_string(), id.to_string())).cloned())
    }

    fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        self.check_read(collection)?;
        let docs = self.lock()?;
        let all = docs
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|((_, id), data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect();
        Ok(run_query(all, query))
    }

    fn set(&self, collection: &str, id: &str, doc: Value, merge: bool) -> Result<()> {
        self.check_write(collection)?;
        {
            let mut docs = self.lock()?;
            let key = (collection.to_string(), id.to_string());
            match docs.get_mut(&key) {
                Some(existing) if merge => merge_into(existing, doc),
                _ => {
                    docs.insert(key, doc);
                }
            }
        }
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
        self.check_write(collection)?;
        let removed = {
            let mut docs = self.lock()?;
            docs.remove(&(collection.to_string(), id.to_string())).is_some()
        };
        if removed {
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
    use crate::storage::document::{DocumentStoreExt, Filter};
    use serde_json::json;

    #[test]
    fn update_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update("orders", "nope", &[FieldUpdate::set("status", "active")])
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn upsert_creates_then_increments() {
        let store = MemoryStore::new();
        store.upsert("users", "u1", &[FieldUpdate::increment("n", 2)]).unwrap();
        let doc = store.upsert("users", "u1", &[FieldUpdate::increment("n", 3)]).unwrap();
        assert_eq!(doc, json!({"n": 5}));
    }

    #[test]
    fn injected_write_failures_run_out() {
        let store = MemoryStore::new();
        store.fail_writes("carts", Some(2));
        assert!(store.set("carts", "u", json!({}), false).is_err());
        assert!(store.set("carts", "u", json!({}), false).is_err());
        assert!(store.set("carts", "u", json!({}), false).is_ok());
    }

    #[test]
    fn zero_injected_failures_disarm() {
        let store = MemoryStore::new();
        store.fail_writes("carts", None);
        store.fail_writes("carts", Some(0));
        store.fail_reads("carts", Some(0));
        assert!(store.set("carts", "u", json!({}), false).is_ok());
        assert!(store.get("carts", "u").unwrap().is_some());
    }

    #[test]
    fn writes_are_broadcast() {
        let store = MemoryStore::new();
        let mut rx = store.watch();
        store.put("orders", "o1", &json!({"userId": "u"})).unwrap();
        store.delete("orders", "o1").unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.kind, ChangeKind::Upserted);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.kind, ChangeKind::Deleted);
        assert_eq!(second.id, "o1");
    }

    #[test]
    fn query_is_scoped_to_collection() {
        let store = MemoryStore::new();
        store.put("orders", "o1", &json!({"userId": "u"})).unwrap();
        store.put("carts", "u", &json!({"userId": "u"})).unwrap();
        let found = store
            .query("orders", &Query::new().filter(Filter::eq("userId", "u")))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.len("carts"), 1);
    }
}

//! Document store abstraction.
//!
//! Every entity lives as a JSON document in a named collection, keyed by a
//! string id. Partial updates are expressed as [`FieldUpdate`] transforms that
//! a store applies atomically, so callers never need read-then-write sequences
//! for counters or array appends.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::{Result, StorageError};

/// Collection names used by the core.
pub mod collections {
    pub const ACTIVITIES: &str = "activities";
    pub const USER_ACTIVITIES: &str = "userActivities";
    pub const CARTS: &str = "carts";
    pub const ORDERS: &str = "orders";
    pub const USERS: &str = "users";
    pub const MENU: &str = "menu";
}

/// Equality filter on a (dot-separated) field path.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn matches(&self, doc: &Value) -> bool {
        get_path(doc, &self.field) == Some(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}

/// Collection query: conjunction of equality filters, optional ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A single field transform inside an atomic update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Overwrite the field.
    Set { field: String, value: Value },
    /// Add `by` to an integer field; a missing field counts as zero.
    Increment { field: String, by: i64 },
    /// Keep the larger of the stored integer and `value`.
    Maximum { field: String, value: i64 },
    /// Append each value not already present in the array.
    ArrayUnion { field: String, values: Vec<Value> },
    /// Drop array elements whose `key` member equals one of `values`.
    ArrayRemoveWhere {
        field: String,
        key: String,
        values: Vec<Value>,
    },
}

impl FieldUpdate {
    pub fn set(field: &str, value: impl Into<Value>) -> Self {
        FieldUpdate::Set {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn set_timestamp(field: &str, at: DateTime<Utc>) -> Self {
        FieldUpdate::set(field, timestamp(at))
    }

    pub fn increment(field: &str, by: i64) -> Self {
        FieldUpdate::Increment {
            field: field.to_string(),
            by,
        }
    }

    pub fn maximum(field: &str, value: i64) -> Self {
        FieldUpdate::Maximum {
            field: field.to_string(),
            value,
        }
    }

    pub fn array_union(field: &str, values: Vec<Value>) -> Self {
        FieldUpdate::ArrayUnion {
            field: field.to_string(),
            values,
        }
    }

    pub fn array_remove_where(field: &str, key: &str, values: Vec<Value>) -> Self {
        FieldUpdate::ArrayRemoveWhere {
            field: field.to_string(),
            key: key.to_string(),
            values,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            FieldUpdate::Set { field, .. }
            | FieldUpdate::Increment { field, .. }
            | FieldUpdate::Maximum { field, .. }
            | FieldUpdate::ArrayUnion { field, .. }
            | FieldUpdate::ArrayRemoveWhere { field, .. } => field,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Upserted,
    Deleted,
}

/// Emitted by a store after every successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: String,
    pub id: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn is_for(&self, collection: &str) -> bool {
        self.collection == collection
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Storage backend consumed by every service.
///
/// Implementations must apply each `update`/`upsert` call atomically and
/// publish a [`ChangeEvent`] after each successful write.
pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;

    /// Write a whole document. With `merge`, object members are merged into
    /// the existing document instead of replacing it.
    fn set(&self, collection: &str, id: &str, doc: Value, merge: bool) -> Result<()>;

    /// Apply transforms to an existing document and return the result.
    /// Fails with `NotFound` when the document does not exist.
    fn update(&self, collection: &str, id: &str, updates: &[FieldUpdate]) -> Result<Value>;

    /// Like [`DocumentStore::update`], starting from an empty object when the
    /// document does not exist yet.
    fn upsert(&self, collection: &str, id: &str, updates: &[FieldUpdate]) -> Result<Value>;

    /// Returns whether a document was removed.
    fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    fn watch(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Typed helpers over any [`DocumentStore`].
pub trait DocumentStoreExt: DocumentStore {
    fn get_as<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        match self.get(collection, id)? {
            Some(doc) => decode(collection, id, doc).map(Some),
            None => Ok(None),
        }
    }

    fn query_as<T: DeserializeOwned>(&self, collection: &str, query: &Query) -> Result<Vec<T>> {
        self.query(collection, query)?
            .into_iter()
            .map(|doc| decode(collection, &doc.id, doc.data))
            .collect()
    }

    fn put<T: Serialize>(&self, collection: &str, id: &str, value: &T) -> Result<()> {
        let doc = serde_json::to_value(value)?;
        self.set(collection, id, doc, false)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}

pub fn decode<T: DeserializeOwned>(collection: &str, id: &str, doc: Value) -> Result<T> {
    serde_json::from_value(doc).map_err(|err| {
        StorageError::Decode {
            collection: collection.to_string(),
            id: id.to_string(),
            message: err.to_string(),
        }
        .into()
    })
}

/// Serialize a timestamp the same way `chrono`'s serde support does.
pub fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
}

pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = root;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

fn slot_mut<'a>(root: &'a mut Value, path: &str) -> std::result::Result<&'a mut Value, StorageError> {
    let bad = |message: &str| StorageError::BadUpdate {
        field: path.to_string(),
        message: message.to_string(),
    };

    if path.is_empty() {
        return Err(bad("field path is empty"));
    }

    let mut current = root;
    for part in path.split('.') {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        let obj = current
            .as_object_mut()
            .ok_or_else(|| bad("parent is not an object"))?;
        current = obj.entry(part.to_string()).or_insert(Value::Null);
    }
    Ok(current)
}

/// Deep-merge `patch` into `target`; non-object values overwrite.
pub fn merge_into(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => merge_into(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply transforms in order to `doc`.
pub fn apply_updates(doc: &mut Value, updates: &[FieldUpdate]) -> std::result::Result<(), StorageError> {
    for update in updates {
        let field = update.field().to_string();
        let bad = |message: String| StorageError::BadUpdate {
            field: field.clone(),
            message,
        };
        let slot = slot_mut(doc, &field)?;

        match update {
            FieldUpdate::Set { value, .. } => *slot = value.clone(),
            FieldUpdate::Increment { by, .. } => {
                let current = integer_or_zero(slot).ok_or_else(|| bad("not an integer".into()))?;
                let next = current
                    .checked_add(*by)
                    .ok_or_else(|| bad(format!("overflow adding {by}")))?;
                *slot = Value::from(next);
            }
            FieldUpdate::Maximum { value, .. } => {
                let current = integer_or_zero(slot).ok_or_else(|| bad("not an integer".into()))?;
                if slot.is_null() || *value > current {
                    *slot = Value::from(*value);
                }
            }
            FieldUpdate::ArrayUnion { values, .. } => {
                if slot.is_null() {
                    *slot = Value::Array(Vec::new());
                }
                let items = slot
                    .as_array_mut()
                    .ok_or_else(|| bad("not an array".into()))?;
                for value in values {
                    if !items.contains(value) {
                        items.push(value.clone());
                    }
                }
            }
            FieldUpdate::ArrayRemoveWhere { key, values, .. } => {
                if slot.is_null() {
                    *slot = Value::Array(Vec::new());
                }
                let items = slot
                    .as_array_mut()
                    .ok_or_else(|| bad("not an array".into()))?;
                items.retain(|item| match item.get(key) {
                    Some(member) => !values.contains(member),
                    None => true,
                });
            }
        }
    }
    Ok(())
}

fn integer_or_zero(value: &Value) -> Option<i64> {
    match value {
        Value::Null => Some(0),
        other => other.as_i64(),
    }
}

/// Filter, sort and limit documents according to `query`.
pub fn run_query(mut docs: Vec<Document>, query: &Query) -> Vec<Document> {
    docs.retain(|doc| query.filters.iter().all(|f| f.matches(&doc.data)));

    if let Some(order) = &query.order {
        docs.sort_by(|a, b| {
            let ord = compare_values(
                get_path(&a.data, &order.field),
                get_path(&b.data, &order.field),
            );
            if order.descending {
                ord.reverse()
            } else {
                ord
            }
        });
    }

    if let Some(limit) = query.limit {
        docs.truncate(limit);
    }
    docs
}

/// Orders missing values first, numbers numerically, RFC 3339 strings
/// chronologically and other strings lexically.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(dx), Ok(dy)) => dx.cmp(&dy),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn increment_treats_missing_field_as_zero() {
        let mut doc = json!({});
        apply_updates(&mut doc, &[FieldUpdate::increment("statistics.totalMinutes", 5)]).unwrap();
        apply_updates(&mut doc, &[FieldUpdate::increment("statistics.totalMinutes", 7)]).unwrap();
        assert_eq!(doc["statistics"]["totalMinutes"], json!(12));
    }

    #[test]
    fn maximum_never_lowers_value() {
        let mut doc = json!({"longestStreak": 9});
        apply_updates(&mut doc, &[FieldUpdate::maximum("longestStreak", 4)]).unwrap();
        assert_eq!(doc["longestStreak"], json!(9));
        apply_updates(&mut doc, &[FieldUpdate::maximum("longestStreak", 11)]).unwrap();
        assert_eq!(doc["longestStreak"], json!(11));
    }

    #[test]
    fn array_union_skips_existing_values() {
        let mut doc = json!({"items": [{"id": "a"}]});
        apply_updates(
            &mut doc,
            &[FieldUpdate::array_union("items", vec![json!({"id": "a"}), json!({"id": "b"})])],
        )
        .unwrap();
        assert_eq!(doc["items"], json!([{"id": "a"}, {"id": "b"}]));
    }

    #[test]
    fn array_remove_where_matches_on_key() {
        let mut doc = json!({"items": [{"id": "a"}, {"id": "b"}, {"id": "c"}]});
        apply_updates(
            &mut doc,
            &[FieldUpdate::array_remove_where("items", "id", vec![json!("a"), json!("c")])],
        )
        .unwrap();
        assert_eq!(doc["items"], json!([{"id": "b"}]));
    }

    #[test]
    fn increment_rejects_non_integer_field() {
        let mut doc = json!({"name": "x"});
        let err = apply_updates(&mut doc, &[FieldUpdate::increment("name", 1)]).unwrap_err();
        assert!(matches!(err, StorageError::BadUpdate { .. }));
    }

    #[test]
    fn merge_keeps_untouched_members() {
        let mut doc = json!({"a": 1, "nested": {"x": 1, "y": 2}});
        merge_into(&mut doc, json!({"nested": {"y": 3}, "b": true}));
        assert_eq!(doc, json!({"a": 1, "b": true, "nested": {"x": 1, "y": 3}}));
    }

    #[test]
    fn query_orders_timestamps_chronologically() {
        let docs = vec![
            Document {
                id: "early".into(),
                data: json!({"userId": "u", "createdAt": "2025-10-21T10:00:00.5Z"}),
            },
            Document {
                id: "late".into(),
                data: json!({"userId": "u", "createdAt": "2025-10-21T10:00:01Z"}),
            },
            Document {
                id: "other".into(),
                data: json!({"userId": "v", "createdAt": "2025-10-22T10:00:00Z"}),
            },
        ];
        let query = Query::new()
            .filter(Filter::eq("userId", "u"))
            .order_by(OrderBy::desc("createdAt"));
        let ids: Vec<_> = run_query(docs, &query).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["late", "early"]);
    }
}

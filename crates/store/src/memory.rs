//! In-process document store for development and tests.
//!
//! Mutations are serialized through one lock, so watchers observe every
//! change in a single store-wide order. Each watcher receives an initial
//! all-`added` batch at subscribe time and then one batch per mutation,
//! diffed against the snapshot it was last shown.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::DocumentStore;
use crate::changes::{ChangeBatch, Delivery, Subscription, diff_snapshots};
use crate::document::{Document, SortDirection, WriteFields, WriteValue, timestamp_value};
use crate::error::StoreError;

/// In-memory [`DocumentStore`] implementation.
///
/// Collections spring into existence on first insert; listing or
/// subscribing to a collection that was never written is an empty result,
/// not an error, matching the hosted backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, HashMap<String, Map<String, Value>>>,
    watchers: Vec<Watcher>,
}

struct Watcher {
    collection: String,
    order_by: String,
    direction: SortDirection,
    sender: mpsc::UnboundedSender<Delivery>,
    last_snapshot: Vec<Document>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(
        &self,
        collection: &str,
        fields: WriteFields<'_>,
    ) -> Result<String, StoreError> {
        let mut inner = self.inner.lock();

        let mut doc = Map::new();
        apply_write(&mut doc, fields)?;

        let id = Uuid::new_v4().to_string();
        inner
            .collections
            .entry(collection.to_owned())
            .or_default()
            .insert(id.clone(), doc);
        debug!(collection, id = %id, "inserted document");

        notify(&mut inner, collection);
        Ok(id)
    }

    async fn list(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.lock();
        Ok(ordered_snapshot(
            &inner.collections,
            collection,
            order_by,
            direction,
        ))
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: WriteFields<'_>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();

        let doc = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
        apply_write(doc, fields)?;
        debug!(collection, id, "updated document");

        notify(&mut inner, collection);
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();

        let removed = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id));
        if removed.is_none() {
            return Err(StoreError::NotFound(format!("{collection}/{id}")));
        }
        debug!(collection, id, "removed document");

        notify(&mut inner, collection);
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<Subscription, StoreError> {
        let mut inner = self.inner.lock();

        let snapshot = ordered_snapshot(&inner.collections, collection, order_by, direction);
        let (sender, receiver) = mpsc::unbounded_channel();

        // The initial delivery is the full existing set, every document
        // arriving as an `added` entry.
        let initial = ChangeBatch {
            added: snapshot.clone(),
            snapshot: snapshot.clone(),
            ..ChangeBatch::default()
        };
        let _ = sender.send(Ok(initial));

        inner.watchers.push(Watcher {
            collection: collection.to_owned(),
            order_by: order_by.to_owned(),
            direction,
            sender,
            last_snapshot: snapshot,
        });
        debug!(collection, order_by, "watcher attached");

        Ok(Subscription::new(receiver))
    }
}

/// Apply one write's fields onto a document, resolving sentinels.
fn apply_write(doc: &mut Map<String, Value>, fields: WriteFields<'_>) -> Result<(), StoreError> {
    for (name, value) in fields {
        let resolved = match value {
            WriteValue::Set(v) => v,
            WriteValue::Timestamp(at) => timestamp_value(at),
            WriteValue::ServerTimestamp => timestamp_value(Utc::now()),
            WriteValue::Increment(amount) => increment_field(doc.get(name), name, amount)?,
        };
        doc.insert(name.to_owned(), resolved);
    }
    Ok(())
}

/// Resolve an atomic increment against the field's current value.
///
/// A missing field behaves as zero, so the result is the increment amount
/// itself; that is how the hosted backend treats it too.
fn increment_field(
    current: Option<&Value>,
    name: &str,
    amount: i64,
) -> Result<Value, StoreError> {
    match current {
        None | Some(Value::Null) => Ok(Value::from(amount)),
        Some(Value::Number(n)) => {
            if let Some(int) = n.as_i64() {
                Ok(Value::from(int + amount))
            } else if let Some(float) = n.as_f64() {
                #[allow(clippy::cast_precision_loss)]
                Ok(Value::from(float + amount as f64))
            } else {
                Err(StoreError::InvalidField(format!(
                    "cannot increment {name}: unsupported numeric value"
                )))
            }
        }
        Some(other) => Err(StoreError::InvalidField(format!(
            "cannot increment {name}: field holds {other}"
        ))),
    }
}

/// Materialize a collection as an ordered snapshot.
fn ordered_snapshot(
    collections: &HashMap<String, HashMap<String, Map<String, Value>>>,
    collection: &str,
    order_by: &str,
    direction: SortDirection,
) -> Vec<Document> {
    let mut docs: Vec<Document> = collections
        .get(collection)
        .map(|docs| {
            docs.iter()
                .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                .collect()
        })
        .unwrap_or_default();

    docs.sort_by(|a, b| {
        // Documents missing the order field sort first; ties break on id so
        // snapshots are deterministic.
        let ord = compare_fields(a.field(order_by), b.field(order_by))
            .then_with(|| a.id.cmp(&b.id));
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    docs
}

fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_values(x, y),
    }
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    const fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ if rank(a) != rank(b) => rank(a).cmp(&rank(b)),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Push a change batch to every watcher of `collection`.
///
/// Watchers whose subscriber went away are dropped here; a batch with no
/// effective change for a given watcher is not delivered.
fn notify(inner: &mut Inner, collection: &str) {
    let mut watchers = std::mem::take(&mut inner.watchers);
    watchers.retain_mut(|watcher| {
        if watcher.collection != collection {
            return true;
        }
        let next = ordered_snapshot(
            &inner.collections,
            &watcher.collection,
            &watcher.order_by,
            watcher.direction,
        );
        let batch = diff_snapshots(&watcher.last_snapshot, &next);
        watcher.last_snapshot = next;
        if !batch.has_changes() {
            return true;
        }
        watcher.sender.send(Ok(batch)).is_ok()
    });
    inner.watchers = watchers;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn ts(second: u32) -> WriteValue {
        WriteValue::timestamp(Utc.with_ymd_and_hms(2025, 11, 3, 9, 0, second).unwrap())
    }

    #[tokio::test]
    async fn test_insert_and_list_ordered() {
        let store = MemoryStore::new();
        let first = store
            .insert(
                "products",
                vec![("name", WriteValue::set("early")), ("createdAt", ts(1))],
            )
            .await
            .unwrap();
        let second = store
            .insert(
                "products",
                vec![("name", WriteValue::set("late")), ("createdAt", ts(30))],
            )
            .await
            .unwrap();

        let newest_first = store
            .list("products", "createdAt", SortDirection::Descending)
            .await
            .unwrap();
        let ids: Vec<&str> = newest_first.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);

        let oldest_first = store
            .list("products", "createdAt", SortDirection::Ascending)
            .await
            .unwrap();
        let ids: Vec<&str> = oldest_first.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec![first.as_str(), second.as_str()]);
    }

    #[tokio::test]
    async fn test_server_timestamp_is_stamped() {
        let store = MemoryStore::new();
        let before = Utc::now();
        store
            .insert("orders", vec![("createdAt", WriteValue::ServerTimestamp)])
            .await
            .unwrap();

        let docs = store
            .list("orders", "createdAt", SortDirection::Ascending)
            .await
            .unwrap();
        let stamped = docs.first().unwrap().field("createdAt").unwrap();
        let stamped: chrono::DateTime<Utc> = stamped.as_str().unwrap().parse().unwrap();
        assert!(stamped >= before);
        assert!(stamped <= Utc::now());
    }

    #[tokio::test]
    async fn test_list_missing_collection_is_empty() {
        let store = MemoryStore::new();
        let docs = store
            .list("nothing", "createdAt", SortDirection::Descending)
            .await
            .unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_update_set_and_increment() {
        let store = MemoryStore::new();
        let id = store
            .insert(
                "products",
                vec![
                    ("name", WriteValue::set("bandeng")),
                    ("stock", WriteValue::set(5)),
                ],
            )
            .await
            .unwrap();

        store
            .update_fields(
                "products",
                &id,
                vec![
                    ("name", WriteValue::set("bandeng presto")),
                    ("stock", WriteValue::increment(-3)),
                ],
            )
            .await
            .unwrap();

        let docs = store
            .list("products", "name", SortDirection::Ascending)
            .await
            .unwrap();
        let doc = docs.first().unwrap();
        assert_eq!(*doc.field("name").unwrap(), "bandeng presto");
        assert_eq!(*doc.field("stock").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_increment_missing_field_starts_at_amount() {
        let store = MemoryStore::new();
        let id = store
            .insert("products", vec![("name", WriteValue::set("x"))])
            .await
            .unwrap();

        store
            .update_fields("products", &id, vec![("stock", WriteValue::increment(7))])
            .await
            .unwrap();

        let docs = store
            .list("products", "name", SortDirection::Ascending)
            .await
            .unwrap();
        assert_eq!(*docs.first().unwrap().field("stock").unwrap(), 7);
    }

    #[tokio::test]
    async fn test_increment_non_numeric_field_fails() {
        let store = MemoryStore::new();
        let id = store
            .insert("products", vec![("stock", WriteValue::set("plenty"))])
            .await
            .unwrap();

        let err = store
            .update_fields("products", &id, vec![("stock", WriteValue::increment(1))])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidField(_)));
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_fields("products", "ghost", vec![("stock", WriteValue::set(1))])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryStore::new();
        let id = store
            .insert("products", vec![("name", WriteValue::set("x"))])
            .await
            .unwrap();

        store.remove("products", &id).await.unwrap();
        let docs = store
            .list("products", "name", SortDirection::Ascending)
            .await
            .unwrap();
        assert!(docs.is_empty());

        let err = store.remove("products", &id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_subscribe_initial_batch_is_all_added() {
        let store = MemoryStore::new();
        store
            .insert(
                "orders",
                vec![("quantity", WriteValue::set(1)), ("createdAt", ts(1))],
            )
            .await
            .unwrap();
        store
            .insert(
                "orders",
                vec![("quantity", WriteValue::set(2)), ("createdAt", ts(2))],
            )
            .await
            .unwrap();

        let mut sub = store
            .subscribe("orders", "createdAt", SortDirection::Descending)
            .await
            .unwrap();
        let batch = sub.recv().await.unwrap().unwrap();
        assert_eq!(batch.added.len(), 2);
        assert!(batch.modified.is_empty());
        assert!(batch.removed.is_empty());
        assert_eq!(batch.snapshot.len(), 2);
    }

    #[tokio::test]
    async fn test_subscribe_delivers_typed_changes() {
        let store = MemoryStore::new();
        let mut sub = store
            .subscribe("orders", "createdAt", SortDirection::Descending)
            .await
            .unwrap();

        // Initial batch is empty: nothing exists yet.
        let initial = sub.recv().await.unwrap().unwrap();
        assert!(initial.snapshot.is_empty());

        let id = store
            .insert(
                "orders",
                vec![("status", WriteValue::set("pending")), ("createdAt", ts(5))],
            )
            .await
            .unwrap();
        let batch = sub.recv().await.unwrap().unwrap();
        assert_eq!(batch.added.len(), 1);
        assert_eq!(batch.snapshot.len(), 1);

        store
            .update_fields("orders", &id, vec![("status", WriteValue::set("completed"))])
            .await
            .unwrap();
        let batch = sub.recv().await.unwrap().unwrap();
        assert_eq!(batch.modified.len(), 1);
        assert_eq!(
            *batch.modified.first().unwrap().field("status").unwrap(),
            "completed"
        );

        store.remove("orders", &id).await.unwrap();
        let batch = sub.recv().await.unwrap().unwrap();
        assert_eq!(batch.removed.len(), 1);
        assert!(batch.snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_two_watchers_receive_independently() {
        let store = MemoryStore::new();
        let mut console = store
            .subscribe("orders", "createdAt", SortDirection::Descending)
            .await
            .unwrap();
        let mut audit = store
            .subscribe("orders", "createdAt", SortDirection::Ascending)
            .await
            .unwrap();
        let _ = console.recv().await.unwrap().unwrap();
        let _ = audit.recv().await.unwrap().unwrap();

        store
            .insert("orders", vec![("createdAt", ts(9))])
            .await
            .unwrap();

        assert_eq!(console.recv().await.unwrap().unwrap().added.len(), 1);
        assert_eq!(audit.recv().await.unwrap().unwrap().added.len(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribed_watcher_is_pruned() {
        let store = MemoryStore::new();
        let sub = store
            .subscribe("orders", "createdAt", SortDirection::Descending)
            .await
            .unwrap();
        sub.unsubscribe();

        // Mutating after unsubscribe must not fail or leak the watcher.
        store
            .insert("orders", vec![("createdAt", ts(1))])
            .await
            .unwrap();
        assert!(store.inner.lock().watchers.is_empty());
    }

    #[tokio::test]
    async fn test_docs_missing_order_field_sort_first_ascending() {
        let store = MemoryStore::new();
        store
            .insert("products", vec![("name", WriteValue::set("dated")), ("createdAt", ts(5))])
            .await
            .unwrap();
        store
            .insert("products", vec![("name", WriteValue::set("undated"))])
            .await
            .unwrap();

        let docs = store
            .list("products", "createdAt", SortDirection::Ascending)
            .await
            .unwrap();
        assert_eq!(*docs.first().unwrap().field("name").unwrap(), "undated");
    }
}

//! Documents and the write-side value sentinels.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// One persisted record: a store-assigned id plus a flat JSON field map.
///
/// Server timestamps are represented as RFC 3339 strings in the field map,
/// which is also how they deserialize into `chrono` types downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned opaque id.
    pub id: String,
    /// Field name to JSON value.
    pub fields: Map<String, Value>,
}

impl Document {
    /// Create a document from an id and field map.
    #[must_use]
    pub const fn new(id: String, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Look up a single field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Deserialize the document into a typed entity.
    ///
    /// The store-assigned id is injected as an `id` field, overriding any
    /// stale `id` the field map may carry.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json` error if the fields do not match the target
    /// type.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_owned(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields))
    }
}

/// Sort direction for ordered reads and subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One field in a write, either a plain value or a backend-side sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    /// Store this JSON value as-is.
    Set(Value),
    /// Store this instant as a timestamp field.
    Timestamp(DateTime<Utc>),
    /// Let the backend stamp the time of the write.
    ServerTimestamp,
    /// Atomically add this amount to a numeric field (updates only).
    Increment(i64),
}

impl WriteValue {
    /// Store a plain value.
    pub fn set(value: impl Into<Value>) -> Self {
        Self::Set(value.into())
    }

    /// Store an explicit client-side timestamp.
    #[must_use]
    pub const fn timestamp(at: DateTime<Utc>) -> Self {
        Self::Timestamp(at)
    }

    /// Atomically add `amount` to a numeric field.
    #[must_use]
    pub const fn increment(amount: i64) -> Self {
        Self::Increment(amount)
    }
}

/// The fields of one write, in declaration order.
pub type WriteFields<'a> = Vec<(&'a str, WriteValue)>;

/// Canonical string form for timestamps stored in documents.
///
/// Microsecond precision with a `Z` suffix keeps values unambiguous and
/// parseable by `chrono`'s RFC 3339 deserializer.
#[must_use]
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

//! Client for the hosted document database's REST API.
//!
//! Documents are read through `:runQuery` and written through `:commit`,
//! which is the only REST surface that supports server timestamps and
//! atomic increments (as field transforms). Document ids are generated
//! client-side the way the hosted SDKs do it: 20 alphanumeric characters.
//!
//! The REST surface has no streaming listen, so [`subscribe`] is emulated
//! by polling the ordered query and diffing consecutive snapshots into
//! change batches. Note that the backend omits documents lacking the
//! order-by field from query results; that is native behavior.
//!
//! [`subscribe`]: DocumentStore::subscribe

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::DocumentStore;
use crate::changes::{ChangeBatch, Subscription, diff_snapshots};
use crate::document::{Document, SortDirection, WriteFields, WriteValue, timestamp_value};
use crate::error::StoreError;

/// Default delay between polls of a subscribed query.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

const DEFAULT_HOST: &str = "https://firestore.googleapis.com";
const DOCUMENT_ID_LENGTH: usize = 20;

/// Connection settings for [`FirestoreStore`].
#[derive(Clone)]
pub struct FirestoreConfig {
    /// Cloud project that owns the database.
    pub project_id: String,
    /// Web API key sent with every request.
    pub api_key: SecretString,
    /// Database id; the hosted default is `(default)`.
    pub database_id: String,
    /// Endpoint override for emulators; `None` uses the hosted endpoint.
    pub endpoint: Option<Url>,
    /// Delay between polls of a subscribed query.
    pub poll_interval: Duration,
}

impl FirestoreConfig {
    /// Settings for the hosted endpoint with the default database.
    #[must_use]
    pub fn new(project_id: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            project_id: project_id.into(),
            api_key,
            database_id: "(default)".to_owned(),
            endpoint: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl std::fmt::Debug for FirestoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreConfig")
            .field("project_id", &self.project_id)
            .field("api_key", &"[REDACTED]")
            .field("database_id", &self.database_id)
            .field("endpoint", &self.endpoint)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// [`DocumentStore`] backed by the hosted document database.
#[derive(Clone)]
pub struct FirestoreStore {
    inner: Arc<FirestoreInner>,
}

struct FirestoreInner {
    client: reqwest::Client,
    /// `{host}/v1/{resource_root}`
    documents_url: String,
    /// `projects/{project}/databases/{db}/documents`, the prefix of
    /// every resource name carried inside request bodies.
    resource_root: String,
    api_key: SecretString,
    poll_interval: Duration,
}

impl FirestoreStore {
    /// Create a client from connection settings.
    #[must_use]
    pub fn new(config: &FirestoreConfig) -> Self {
        let host = config.endpoint.as_ref().map_or_else(
            || DEFAULT_HOST.to_owned(),
            |url| url.as_str().trim_end_matches('/').to_owned(),
        );
        let resource_root = format!(
            "projects/{}/databases/{}/documents",
            config.project_id, config.database_id
        );

        Self {
            inner: Arc::new(FirestoreInner {
                client: reqwest::Client::new(),
                documents_url: format!("{host}/v1/{resource_root}"),
                resource_root,
                api_key: config.api_key.clone(),
                poll_interval: config.poll_interval,
            }),
        }
    }

    /// Full resource name of one document.
    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.inner.resource_root)
    }

    /// Send one request and decode the response body.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, StoreError> {
        let response = request
            .query(&[("key", self.inner.api_key.expose_secret())])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "store request failed"
            );
            return Err(map_api_error(status.as_u16(), &body));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn commit(&self, write: Value) -> Result<(), StoreError> {
        let url = format!("{}:commit", self.inner.documents_url);
        let body = json!({ "writes": [write] });
        self.execute(self.inner.client.post(&url).json(&body))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self, fields))]
    async fn insert(
        &self,
        collection: &str,
        fields: WriteFields<'_>,
    ) -> Result<String, StoreError> {
        let id = generate_document_id();
        let name = self.document_name(collection, &id);
        let write = build_commit_write(&name, fields, Precondition::MustNotExist);
        self.commit(write).await?;
        debug!(id = %id, "document inserted");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}:runQuery", self.inner.documents_url);
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "orderBy": [{
                    "field": { "fieldPath": order_by },
                    "direction": direction_keyword(direction),
                }],
            }
        });

        let response = self.execute(self.inner.client.post(&url).json(&body)).await?;
        let entries = response.as_array().cloned().unwrap_or_default();

        let mut docs = Vec::new();
        for entry in &entries {
            // Entries without a document (read-time markers on empty
            // results) are expected; a document we cannot decode is not.
            let Some(resource) = entry.get("document") else {
                continue;
            };
            match parse_document_resource(resource) {
                Some(doc) => docs.push(doc),
                None => warn!(collection, "skipping undecodable document in query result"),
            }
        }
        Ok(docs)
    }

    #[instrument(skip(self, fields))]
    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: WriteFields<'_>,
    ) -> Result<(), StoreError> {
        let name = self.document_name(collection, id);
        let write = build_commit_write(&name, fields, Precondition::MustExist);
        self.commit(write).await
    }

    #[instrument(skip(self))]
    async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = format!("{}/{collection}/{id}", self.inner.documents_url);
        self.execute(
            self.inner
                .client
                .delete(&url)
                .query(&[("currentDocument.exists", "true")]),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn subscribe(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<Subscription, StoreError> {
        // Take the first snapshot before spawning so an unreachable
        // backend fails the subscribe call itself.
        let initial = self.list(collection, order_by, direction).await?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let first = ChangeBatch {
            added: initial.clone(),
            snapshot: initial.clone(),
            ..ChangeBatch::default()
        };
        let _ = sender.send(Ok(first));

        let store = self.clone();
        let collection = collection.to_owned();
        let order_by = order_by.to_owned();
        tokio::spawn(async move {
            let mut last = initial;
            loop {
                tokio::time::sleep(store.inner.poll_interval).await;
                if sender.is_closed() {
                    debug!(collection, "subscriber went away, poll loop ends");
                    break;
                }
                match store.list(&collection, &order_by, direction).await {
                    Ok(next) => {
                        let batch = diff_snapshots(&last, &next);
                        last = next;
                        if batch.has_changes() && sender.send(Ok(batch)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        // No automatic reconnect: surface the transport
                        // failure once and end the stream.
                        error!(error = %e, collection, "subscription poll failed");
                        let _ = sender.send(Err(e));
                        break;
                    }
                }
            }
        });

        Ok(Subscription::new(receiver))
    }
}

enum Precondition {
    MustExist,
    MustNotExist,
}

/// Encode one write for the `:commit` endpoint.
///
/// Plain values go into the update's field map (masked on updates so
/// untouched fields survive); server timestamps and increments become
/// field transforms. A write that is nothing but transforms is encoded
/// as a bare transform write.
fn build_commit_write(doc_name: &str, fields: WriteFields<'_>, precondition: Precondition) -> Value {
    let mut plain = Map::new();
    let mut mask_paths = Vec::new();
    let mut transforms = Vec::new();

    for (name, value) in fields {
        match value {
            WriteValue::Set(v) => {
                plain.insert(name.to_owned(), to_firestore_value(&v));
                mask_paths.push(Value::String(name.to_owned()));
            }
            WriteValue::Timestamp(at) => {
                plain.insert(name.to_owned(), json!({ "timestampValue": timestamp_value(at) }));
                mask_paths.push(Value::String(name.to_owned()));
            }
            WriteValue::ServerTimestamp => transforms.push(json!({
                "fieldPath": name,
                "setToServerValue": "REQUEST_TIME",
            })),
            WriteValue::Increment(amount) => transforms.push(json!({
                "fieldPath": name,
                "increment": { "integerValue": amount.to_string() },
            })),
        }
    }

    let is_update = matches!(precondition, Precondition::MustExist);
    let mut write = Map::new();

    if is_update && plain.is_empty() && !transforms.is_empty() {
        write.insert(
            "transform".to_owned(),
            json!({ "document": doc_name, "fieldTransforms": transforms }),
        );
    } else {
        write.insert(
            "update".to_owned(),
            json!({ "name": doc_name, "fields": plain }),
        );
        if is_update {
            write.insert("updateMask".to_owned(), json!({ "fieldPaths": mask_paths }));
        }
        if !transforms.is_empty() {
            write.insert("updateTransforms".to_owned(), Value::Array(transforms));
        }
    }

    write.insert(
        "currentDocument".to_owned(),
        json!({ "exists": is_update }),
    );
    Value::Object(write)
}

const fn direction_keyword(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Ascending => "ASCENDING",
        SortDirection::Descending => "DESCENDING",
    }
}

/// Random 20-character alphanumeric id, the hosted SDKs' auto-id shape.
fn generate_document_id() -> String {
    use rand::Rng;
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(DOCUMENT_ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Decode one document resource from a query response.
fn parse_document_resource(resource: &Value) -> Option<Document> {
    let name = resource.get("name")?.as_str()?;
    let id = name.rsplit('/').next()?.to_owned();
    let fields = resource
        .get("fields")
        .and_then(Value::as_object)
        .map(from_firestore_fields)
        .unwrap_or_default();
    Some(Document::new(id, fields))
}

fn from_firestore_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), from_firestore_value(value)))
        .collect()
}

/// Decode one typed value into plain JSON.
///
/// Timestamps become RFC 3339 strings, the same representation the
/// in-memory backend stores, so documents look identical downstream.
fn from_firestore_value(value: &Value) -> Value {
    let Some(map) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = map.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map_or_else(|| inner.clone(), Value::from),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(from_firestore_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(from_firestore_fields)
                .unwrap_or_default(),
        ),
        // booleanValue, doubleValue, timestampValue, stringValue,
        // bytesValue, referenceValue, geoPointValue all carry their
        // JSON form directly.
        _ => inner.clone(),
    }
}

/// Encode one plain JSON value as a typed value.
fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => n.as_i64().map_or_else(
            || json!({ "doubleValue": n }),
            |int| json!({ "integerValue": int.to_string() }),
        ),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(values) => json!({
            "arrayValue": { "values": values.iter().map(to_firestore_value).collect::<Vec<_>>() }
        }),
        Value::Object(fields) => json!({
            "mapValue": {
                "fields": fields
                    .iter()
                    .map(|(name, v)| (name.clone(), to_firestore_value(v)))
                    .collect::<Map<_, _>>()
            }
        }),
    }
}

fn map_api_error(status: u16, body: &str) -> StoreError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ErrorDetail>,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
        status: Option<String>,
    }

    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error);
    let code = detail
        .as_ref()
        .and_then(|d| d.status.clone())
        .unwrap_or_default();
    let message = detail
        .and_then(|d| d.message)
        .unwrap_or_else(|| body.chars().take(200).collect());

    // Failed `exists` preconditions are how the commit endpoint reports
    // writes against missing documents.
    if status == 404 || code == "NOT_FOUND" || code == "FAILED_PRECONDITION" {
        StoreError::NotFound(message)
    } else {
        StoreError::Api { status, message }
    }
}

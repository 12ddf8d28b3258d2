//! Warung Store - document database boundary.
//!
//! Every persistent operation in Warung is delegated to a hosted document
//! database. This crate defines that boundary as the [`DocumentStore`] trait
//! plus the value types that cross it, and ships two implementations:
//!
//! - [`MemoryStore`] - a complete in-process backend for development and
//!   tests, including live change subscriptions.
//! - [`FirestoreStore`] - a client for the hosted database's REST API.
//!
//! # Operations
//!
//! The trait mirrors the five primitives the storefront and console need:
//! insert, ordered list, partial field update (with an atomic numeric
//! increment sentinel), delete, and subscribe. Subscriptions deliver
//! [`ChangeBatch`]es: each delivery carries the typed added/modified/removed
//! entries *and* the full post-change snapshot, because downstream consumers
//! classify on the entries but replace their view from the snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! use warung_store::{DocumentStore, MemoryStore, SortDirection, WriteValue};
//!
//! let store = MemoryStore::new();
//! let id = store
//!     .insert("products", vec![
//!         ("name", WriteValue::set("Bandeng Presto")),
//!         ("stock", WriteValue::set(12)),
//!         ("createdAt", WriteValue::ServerTimestamp),
//!     ])
//!     .await?;
//!
//! let mut sub = store.subscribe("products", "createdAt", SortDirection::Descending).await?;
//! while let Some(batch) = sub.recv().await {
//!     // react to changes
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod changes;
mod document;
mod error;
mod firestore;
mod memory;

pub use changes::{ChangeBatch, Delivery, Subscription};
pub use document::{Document, SortDirection, WriteFields, WriteValue};
pub use error::StoreError;
pub use firestore::{FirestoreConfig, FirestoreStore};
pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;

/// The five primitives Warung needs from its document database.
///
/// All methods are asynchronous and non-blocking; implementations must be
/// safe to share across tasks (`Send + Sync`). Collections are addressed by
/// plain name, documents by their store-assigned string id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document and return its store-assigned id.
    ///
    /// [`WriteValue::ServerTimestamp`] fields are stamped by the backend at
    /// write time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend rejects the write or is
    /// unreachable.
    async fn insert(&self, collection: &str, fields: WriteFields<'_>) -> Result<String, StoreError>;

    /// Read the full collection ordered by one field (snapshot read).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend rejects the query or is
    /// unreachable.
    async fn list(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<Vec<Document>, StoreError>;

    /// Partially update one document. Fields not named are left untouched.
    ///
    /// [`WriteValue::Increment`] applies a race-free numeric increment on the
    /// backend; it is never a local read-modify-write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the document does not exist, or
    /// another [`StoreError`] for backend failures.
    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: WriteFields<'_>,
    ) -> Result<(), StoreError>;

    /// Delete one document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the document does not exist, or
    /// another [`StoreError`] for backend failures.
    async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Open a live subscription on an ordered collection query.
    ///
    /// The first delivery is the current full snapshot (every document as an
    /// `added` entry); each subsequent delivery is one [`ChangeBatch`] per
    /// observed change. Dropping the returned [`Subscription`] (or calling
    /// [`Subscription::unsubscribe`]) detaches it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the subscription cannot be established.
    async fn subscribe(
        &self,
        collection: &str,
        order_by: &str,
        direction: SortDirection,
    ) -> Result<Subscription, StoreError>;
}

/// Shared handle to a document store, as held by the storefront and console.
pub type SharedStore = Arc<dyn DocumentStore>;

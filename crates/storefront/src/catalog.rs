//! Buyer-facing product catalog.
//!
//! Products come from the store ordered newest first, with a short-lived
//! snapshot cache in front so repeated renders do not refetch. Documents
//! that fail to decode are skipped with a warning rather than failing the
//! whole listing.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument, warn};
use warung_core::{Product, ProductId, collections};
use warung_store::{Document, DocumentStore, SharedStore, SortDirection, StoreError};

/// How long a catalog snapshot is served before the next read refetches.
const SNAPSHOT_TTL: Duration = Duration::from_secs(60);
const SNAPSHOT_KEY: &str = "products";

/// Ordered, cached view of the product collection.
#[derive(Clone)]
pub struct Catalog {
    store: SharedStore,
    cache: Cache<String, Arc<Vec<Product>>>,
}

impl Catalog {
    /// Create a catalog over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(SNAPSHOT_TTL)
            .build();
        Self { store, cache }
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the snapshot cannot be fetched.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Arc<Vec<Product>>, StoreError> {
        if let Some(products) = self.cache.get(SNAPSHOT_KEY).await {
            debug!("catalog cache hit");
            return Ok(products);
        }

        let docs = self
            .store
            .list(collections::PRODUCTS, "createdAt", SortDirection::Descending)
            .await?;
        let products = Arc::new(parse_products(&docs));
        debug!(count = products.len(), "catalog fetched");
        self.cache
            .insert(SNAPSHOT_KEY.to_owned(), Arc::clone(&products))
            .await;
        Ok(products)
    }

    /// Products a buyer can currently purchase (positive stock), newest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the snapshot cannot be fetched.
    pub async fn available_products(&self) -> Result<Vec<Product>, StoreError> {
        let products = self.products().await?;
        Ok(products
            .iter()
            .filter(|product| product.in_stock())
            .cloned()
            .collect())
    }

    /// One product by id. A product deleted since the buyer last saw it
    /// reports not-found.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids, or another
    /// [`StoreError`] when the snapshot cannot be fetched.
    pub async fn product(&self, id: &ProductId) -> Result<Product, StoreError> {
        let products = self.products().await?;
        products
            .iter()
            .find(|product| &product.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))
    }

    /// Drop the cached snapshot so the next read fetches fresh data.
    ///
    /// Callers invoke this after anything that changes products, such as
    /// a completed purchase decrementing stock.
    pub async fn invalidate(&self) {
        self.cache.invalidate(SNAPSHOT_KEY).await;
    }
}

/// Decode stored documents, skipping any that do not parse.
fn parse_products(docs: &[Document]) -> Vec<Product> {
    docs.iter()
        .filter_map(|doc| match doc.parse::<Product>() {
            Ok(product) => Some(product),
            Err(e) => {
                warn!(id = %doc.id, error = %e, "skipping undecodable product");
                None
            }
        })
        .collect()
}

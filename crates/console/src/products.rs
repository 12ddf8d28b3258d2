//! Product administration for the seller console.
//!
//! Sellers manage the catalog through [`ProductManager`]: create, edit,
//! delete, and list. Form input arrives as strings and is parsed into a
//! typed [`ProductInput`] before anything touches the store. A live
//! product watch pushes re-parsed snapshots so the console re-renders on
//! any catalog change, its own writes included.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use warung_core::{Price, PriceError, Product, ProductId, collections};
use warung_store::{
    Document, DocumentStore, SharedStore, SortDirection, StoreError, WriteValue,
};

/// Validated product fields, ready to write.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    /// Display name.
    pub name: String,
    /// Longer description shown on the detail view.
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Sellable units.
    pub stock: i64,
    /// Image URL.
    pub image: String,
}

/// Raw string fields as they come off the product form.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock: String,
    pub image: String,
}

/// Why a product form did not validate.
#[derive(Debug, Error)]
pub enum ProductFormError {
    /// The name field was empty or whitespace.
    #[error("name must not be empty")]
    EmptyName,

    /// The price field did not parse to a non-negative amount.
    #[error("price: {0}")]
    Price(#[from] PriceError),

    /// The stock field did not parse to a non-negative count.
    #[error("stock: {0}")]
    Stock(String),
}

impl ProductForm {
    /// Validate the form into a typed input.
    ///
    /// All fields are trimmed; numeric fields must parse and be
    /// non-negative. Nothing reaches the store until this succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductFormError`] naming the first offending field.
    pub fn parse(&self) -> Result<ProductInput, ProductFormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ProductFormError::EmptyName);
        }

        let price = Price::parse(&self.price)?;

        let stock = self
            .stock
            .trim()
            .parse::<i64>()
            .map_err(|e| ProductFormError::Stock(e.to_string()))?;
        if stock < 0 {
            return Err(ProductFormError::Stock("must be zero or more".to_owned()));
        }

        Ok(ProductInput {
            name: name.to_owned(),
            description: self.description.trim().to_owned(),
            price,
            stock,
            image: self.image.trim().to_owned(),
        })
    }
}

/// Dashboard counters derived from a product snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogStats {
    /// Products in the catalog.
    pub total: usize,
    /// Products with exactly zero stock. An oversold negative count is
    /// not shown as out-of-stock, matching the dashboard counter.
    pub out_of_stock: usize,
}

impl CatalogStats {
    /// Derive the counters from a snapshot.
    #[must_use]
    pub fn from_products(products: &[Product]) -> Self {
        Self {
            total: products.len(),
            out_of_stock: products.iter().filter(|p| p.stock == 0).count(),
        }
    }
}

/// Seller-side catalog operations.
#[derive(Clone)]
pub struct ProductManager {
    store: SharedStore,
}

impl ProductManager {
    /// Create a manager over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create a product. Both `createdAt` and `updatedAt` are stamped by
    /// the backend at write time.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write is rejected.
    pub async fn create(&self, input: &ProductInput) -> Result<ProductId, StoreError> {
        let fields = vec![
            ("name", WriteValue::set(input.name.as_str())),
            ("description", WriteValue::set(input.description.as_str())),
            ("price", WriteValue::Set(serde_json::to_value(input.price)?)),
            ("stock", WriteValue::set(input.stock)),
            ("image", WriteValue::set(input.image.as_str())),
            ("createdAt", WriteValue::ServerTimestamp),
            ("updatedAt", WriteValue::ServerTimestamp),
        ];
        let id = self.store.insert(collections::PRODUCTS, fields).await?;
        info!(product = %id, name = %input.name, "product created");
        Ok(ProductId::new(id))
    }

    /// Replace a product's fields. Only `updatedAt` is re-stamped; the
    /// creation time keeps its original value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids, or another
    /// [`StoreError`] when the write is rejected.
    pub async fn update(&self, id: &ProductId, input: &ProductInput) -> Result<(), StoreError> {
        let fields = vec![
            ("name", WriteValue::set(input.name.as_str())),
            ("description", WriteValue::set(input.description.as_str())),
            ("price", WriteValue::Set(serde_json::to_value(input.price)?)),
            ("stock", WriteValue::set(input.stock)),
            ("image", WriteValue::set(input.image.as_str())),
            ("updatedAt", WriteValue::ServerTimestamp),
        ];
        self.store
            .update_fields(collections::PRODUCTS, id.as_str(), fields)
            .await?;
        info!(product = %id, "product updated");
        Ok(())
    }

    /// Delete a product. Orders referencing it keep their name snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids, or another
    /// [`StoreError`] when the delete is rejected.
    pub async fn delete(&self, id: &ProductId) -> Result<(), StoreError> {
        self.store
            .remove(collections::PRODUCTS, id.as_str())
            .await?;
        info!(product = %id, "product deleted");
        Ok(())
    }

    /// All products, newest first. Undecodable documents are skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the listing cannot be fetched.
    pub async fn products(&self) -> Result<Vec<Product>, StoreError> {
        let docs = self
            .store
            .list(collections::PRODUCTS, "createdAt", SortDirection::Descending)
            .await?;
        Ok(parse_products(&docs))
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

/// Notifications from the live product watch.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductEvent {
    /// The catalog changed; `products` is the full re-parsed snapshot,
    /// newest first.
    Updated {
        /// Post-change snapshot.
        products: Vec<Product>,
    },
    /// The subscription failed; no further events will arrive.
    SubscriptionLost {
        /// Human-readable transport or backend error.
        reason: String,
    },
}

/// Running product watch. Dropping the handle stops it.
pub struct ProductWatchHandle {
    events: mpsc::UnboundedReceiver<ProductEvent>,
    task: JoinHandle<()>,
}

impl ProductWatchHandle {
    /// Receive the next event. `None` means the watch has ended.
    pub async fn recv(&mut self) -> Option<ProductEvent> {
        self.events.recv().await
    }
}

impl Drop for ProductWatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start a live product watch over `store`.
///
/// Every change to the product collection delivers one
/// [`ProductEvent::Updated`] carrying the full snapshot, the console's own
/// writes included, so the product table and dashboard counters re-render
/// from one source. No automatic reconnect.
///
/// # Errors
///
/// Returns a [`StoreError`] when the subscription cannot be established;
/// nothing is spawned in that case.
pub async fn spawn_product_watch(store: SharedStore) -> Result<ProductWatchHandle, StoreError> {
    let mut subscription = store
        .subscribe(collections::PRODUCTS, "createdAt", SortDirection::Descending)
        .await?;
    info!("product watch started");

    let (sender, events) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        while let Some(delivery) = subscription.recv().await {
            match delivery {
                Ok(batch) => {
                    let products = parse_products(&batch.snapshot);
                    debug!(count = products.len(), "product snapshot applied");
                    if sender.send(ProductEvent::Updated { products }).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "product subscription lost");
                    let _ = sender.send(ProductEvent::SubscriptionLost {
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }
    });

    Ok(ProductWatchHandle { events, task })
}

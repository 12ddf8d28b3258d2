//! Integration tests for Warung.
//!
//! Cross-crate scenarios driven over the in-memory document store: the
//! buyer flow (`warung-storefront`), the seller flow (`warung-console`),
//! and the two together against one shared store.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p warung-integration-tests
//! ```
//!
//! The scenarios need no network and no hosted database; everything runs
//! against [`warung_store::MemoryStore`], which implements the same
//! [`warung_store::DocumentStore`] contract as the REST backend, live
//! subscriptions included.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use warung_core::{Product, ProductId, collections};
use warung_store::{DocumentStore, MemoryStore, SharedStore, SortDirection, WriteValue};

/// Install a test subscriber once; later calls are a no-op.
///
/// Honors `RUST_LOG`, so `RUST_LOG=debug cargo test` shows the stores'
/// and watchers' tracing output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fresh in-memory store behind the shared handle the crates expect.
#[must_use]
pub fn memory_store() -> SharedStore {
    Arc::new(MemoryStore::new())
}

/// Seed a product the way the seller console writes them and return the
/// parsed snapshot a buyer would see.
///
/// # Panics
///
/// Panics when the store rejects the writes; seeding failures are test
/// bugs, not scenarios.
pub async fn seed_product(store: &SharedStore, name: &str, price: f64, stock: i64) -> Product {
    let id = store
        .insert(
            collections::PRODUCTS,
            vec![
                ("name", WriteValue::set(name)),
                ("description", WriteValue::set(format!("{name} asli Semarang"))),
                ("price", WriteValue::set(price)),
                ("stock", WriteValue::set(stock)),
                ("image", WriteValue::set("")),
                ("createdAt", WriteValue::ServerTimestamp),
                ("updatedAt", WriteValue::ServerTimestamp),
            ],
        )
        .await
        .expect("seed product");
    fetch_product(store, &ProductId::new(id)).await
}

/// Seed an order document directly, bypassing order intake, with an
/// explicit creation time. Returns the document id.
///
/// # Panics
///
/// Panics when the store rejects the write.
pub async fn seed_order(
    store: &SharedStore,
    product: &Product,
    quantity: u32,
    status: &str,
    created_at: DateTime<Utc>,
) -> String {
    store
        .insert(
            collections::ORDERS,
            vec![
                ("productId", WriteValue::set(product.id.as_str())),
                ("productName", WriteValue::set(product.name.as_str())),
                ("quantity", WriteValue::set(quantity)),
                (
                    "totalPrice",
                    WriteValue::Set(
                        serde_json::to_value(
                            product.price.checked_mul(quantity).expect("total"),
                        )
                        .expect("price json"),
                    ),
                ),
                ("status", WriteValue::set(status)),
                ("createdAt", WriteValue::timestamp(created_at)),
            ],
        )
        .await
        .expect("seed order")
}

/// Re-read one product from the store.
///
/// # Panics
///
/// Panics when the product is missing or does not parse.
pub async fn fetch_product(store: &SharedStore, id: &ProductId) -> Product {
    store
        .list(collections::PRODUCTS, "createdAt", SortDirection::Descending)
        .await
        .expect("list products")
        .into_iter()
        .find(|doc| doc.id == id.as_str())
        .expect("product exists")
        .parse()
        .expect("product parses")
}

/// Current stock of one product, read fresh from the store.
///
/// # Panics
///
/// Panics when the product is missing.
pub async fn stock_of(store: &SharedStore, id: &ProductId) -> i64 {
    fetch_product(store, id).await.stock
}

/// All order documents, oldest first.
///
/// # Panics
///
/// Panics when the listing fails.
pub async fn list_orders(store: &SharedStore) -> Vec<warung_store::Document> {
    store
        .list(collections::ORDERS, "createdAt", SortDirection::Ascending)
        .await
        .expect("list orders")
}

//! Order handling for the seller console.
//!
//! The live view comes from the order watch; this module holds the one
//! write a seller performs against an order.

use tracing::info;
use warung_core::{OrderId, OrderStatus, collections};
use warung_store::{DocumentStore, SharedStore, StoreError, WriteValue};

/// Seller-side order operations.
#[derive(Clone)]
pub struct OrderDesk {
    store: SharedStore,
}

impl OrderDesk {
    /// Create an order desk over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Mark an order completed.
    ///
    /// The write is unconditional: it does not check the current status,
    /// so completing an already-completed order succeeds and re-stamps
    /// `completedAt` with a fresh server time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids, or another
    /// [`StoreError`] when the write is rejected.
    pub async fn complete(&self, id: &OrderId) -> Result<(), StoreError> {
        self.store
            .update_fields(
                collections::ORDERS,
                id.as_str(),
                vec![
                    (
                        "status",
                        WriteValue::set(OrderStatus::Completed.to_string()),
                    ),
                    ("completedAt", WriteValue::ServerTimestamp),
                ],
            )
            .await?;
        info!(order = %id, "order completed");
        Ok(())
    }
}

//! Order intake: buy-now and cart checkout.
//!
//! Both entry points run the same per-line path: one atomic stock
//! decrement on the product, then one order document insert. Lines are
//! processed sequentially in list order and nothing is rolled back; when
//! a line fails, the error reports every order that already went through
//! so the caller can reconcile.

use thiserror::Error;
use tracing::{info, instrument, warn};
use warung_core::{OrderId, OrderStatus, Price, Product, ProductId, collections};
use warung_store::{DocumentStore, SharedStore, StoreError, WriteValue};

use crate::cart::{CartError, CartLedger, CartLine};

/// One line of a purchase: the snapshot order intake writes from.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseLine {
    /// Product to decrement and reference from the order.
    pub product_id: ProductId,
    /// Name copied onto the order document.
    pub product_name: String,
    /// Unit price the total is computed from.
    pub unit_price: Price,
    /// Units to purchase.
    pub quantity: u32,
}

impl PurchaseLine {
    /// Build a line from a product snapshot and a chosen quantity.
    #[must_use]
    pub fn new(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity,
        }
    }
}

impl From<&CartLine> for PurchaseLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            product_name: line.name.clone(),
            unit_price: line.price,
            quantity: line.quantity,
        }
    }
}

/// Receipt for one persisted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    /// Store-assigned id of the order document.
    pub order_id: OrderId,
    /// Product the order was placed for.
    pub product_id: ProductId,
}

/// Errors raised by order intake.
#[derive(Debug, Error)]
pub enum PurchaseError {
    /// A line was rejected before any store write happened.
    #[error("line {line} ({product_name}) is not purchasable: {reason}")]
    InvalidLine {
        /// Zero-based index into the submitted lines.
        line: usize,
        /// Name of the rejected product.
        product_name: String,
        /// What made the line unpurchasable.
        reason: String,
    },

    /// A store write failed mid-sequence. `placed` lists the orders that
    /// already went through; their stock decrements and documents stand.
    #[error("purchase stopped at line {line} ({product_name}) after {} orders were placed: {source}", placed.len())]
    LineFailed {
        /// Receipts for the lines that completed before the failure.
        placed: Vec<PlacedOrder>,
        /// Zero-based index of the failing line.
        line: usize,
        /// Name of the product on the failing line.
        product_name: String,
        /// The store error that stopped the sequence.
        source: StoreError,
    },

    /// Every order was placed but the cart could not be cleared afterwards.
    #[error("orders were placed but clearing the cart failed: {source}")]
    CartNotCleared {
        /// Receipts for all placed orders.
        placed: Vec<PlacedOrder>,
        /// The cart persistence error.
        source: CartError,
    },
}

/// Turns purchases into stock decrements plus order documents.
#[derive(Clone)]
pub struct Checkout {
    store: SharedStore,
}

impl Checkout {
    /// Create an order intake over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Purchase the given lines sequentially, in list order.
    ///
    /// Per line: one atomic stock decrement on the product, then one
    /// order insert carrying the line's snapshot name, the computed
    /// total, a pending status, and a server-stamped creation time. The
    /// decrement is unconditional, so a concurrent sale can drive stock
    /// negative; the store stays the arbiter of the final count.
    ///
    /// # Errors
    ///
    /// [`PurchaseError::InvalidLine`] if any line fails local validation;
    /// no store write has happened in that case.
    /// [`PurchaseError::LineFailed`] if a store write fails; earlier
    /// lines' orders stand and are listed in the error.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn purchase(
        &self,
        lines: &[PurchaseLine],
    ) -> Result<Vec<PlacedOrder>, PurchaseError> {
        // Validate every line before the first write.
        let mut totals = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            if line.quantity == 0 {
                return Err(PurchaseError::InvalidLine {
                    line: index,
                    product_name: line.product_name.clone(),
                    reason: "quantity must be at least 1".to_owned(),
                });
            }
            let Some(total) = line.unit_price.checked_mul(line.quantity) else {
                return Err(PurchaseError::InvalidLine {
                    line: index,
                    product_name: line.product_name.clone(),
                    reason: "line total overflows".to_owned(),
                });
            };
            totals.push(total);
        }

        let mut placed = Vec::with_capacity(lines.len());
        for (index, (line, total)) in lines.iter().zip(totals).enumerate() {
            match self.purchase_line(line, total).await {
                Ok(order_id) => placed.push(PlacedOrder {
                    order_id,
                    product_id: line.product_id.clone(),
                }),
                Err(source) => {
                    warn!(
                        line = index,
                        product = %line.product_name,
                        placed = placed.len(),
                        error = %source,
                        "purchase stopped"
                    );
                    return Err(PurchaseError::LineFailed {
                        placed,
                        line: index,
                        product_name: line.product_name.clone(),
                        source,
                    });
                }
            }
        }

        info!(orders = placed.len(), "purchase complete");
        Ok(placed)
    }

    /// Single-product purchase that bypasses the cart.
    ///
    /// Returns the receipts from [`purchase`](Self::purchase); on success
    /// the list holds exactly one entry.
    ///
    /// # Errors
    ///
    /// Same contract as [`purchase`](Self::purchase).
    pub async fn buy_now(
        &self,
        product: &Product,
        quantity: u32,
    ) -> Result<Vec<PlacedOrder>, PurchaseError> {
        let line = PurchaseLine::new(product, quantity);
        self.purchase(std::slice::from_ref(&line)).await
    }

    /// Drain the cart: purchase every line, then clear the cart.
    ///
    /// The cart is cleared only when every line succeeded; after a
    /// partial failure it still holds all lines, including the ones whose
    /// orders were placed. An empty cart is a no-op.
    ///
    /// # Errors
    ///
    /// Purchase errors pass through unchanged; if clearing the cart
    /// fails, [`PurchaseError::CartNotCleared`] carries the receipts.
    pub async fn checkout(
        &self,
        cart: &mut CartLedger,
    ) -> Result<Vec<PlacedOrder>, PurchaseError> {
        if cart.is_empty() {
            return Ok(Vec::new());
        }

        let lines: Vec<PurchaseLine> = cart.lines().iter().map(PurchaseLine::from).collect();
        let placed = self.purchase(&lines).await?;

        if let Err(source) = cart.clear() {
            return Err(PurchaseError::CartNotCleared { placed, source });
        }
        Ok(placed)
    }

    /// Decrement stock, then insert the order document.
    async fn purchase_line(&self, line: &PurchaseLine, total: Price) -> Result<OrderId, StoreError> {
        // Atomic server-side decrement, never a local read-modify-write.
        self.store
            .update_fields(
                collections::PRODUCTS,
                line.product_id.as_str(),
                vec![(
                    "stock",
                    WriteValue::increment(-i64::from(line.quantity)),
                )],
            )
            .await?;

        let fields = vec![
            ("productId", WriteValue::set(line.product_id.as_str())),
            ("productName", WriteValue::set(line.product_name.as_str())),
            ("quantity", WriteValue::set(line.quantity)),
            ("totalPrice", WriteValue::Set(serde_json::to_value(total)?)),
            ("status", WriteValue::set(OrderStatus::Pending.to_string())),
            ("createdAt", WriteValue::ServerTimestamp),
        ];
        let id = self.store.insert(collections::ORDERS, fields).await?;
        Ok(OrderId::new(id))
    }
}

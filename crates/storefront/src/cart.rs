//! Client-local cart ledger.
//!
//! The cart is purely local state: at most one line per product, repeated
//! adds merge into the existing line, and every mutation persists the full
//! line set through [`CartStorage`] before returning. Nothing here talks
//! to the document store; stock is only consulted from the product
//! snapshot the caller passes in.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use warung_core::{Price, Product, ProductId};

use crate::storage::CartStorage;

/// Errors that can occur in cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Additions must carry at least one unit.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// The product has no sellable stock.
    #[error("{name} is out of stock")]
    OutOfStock {
        /// Display name of the rejected product.
        name: String,
    },

    /// The cart slot could not be read or written.
    #[error("cart storage: {0}")]
    Storage(#[from] std::io::Error),

    /// The persisted cart does not decode; the file needs manual repair
    /// or deletion before the cart can load.
    #[error("cart file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// One cart line: a product snapshot plus the chosen quantity.
///
/// Name, price, and image are captured at add time and are not re-synced
/// when the product changes later. The persisted form keeps the original
/// field layout (`id` for the product id), so carts written by earlier
/// versions keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product this line refers to.
    #[serde(rename = "id")]
    pub product_id: ProductId,
    /// Product name at add time.
    pub name: String,
    /// Unit price at add time.
    pub price: Price,
    /// Image URL at add time.
    #[serde(default)]
    pub image: String,
    /// Units of the product in the cart.
    pub quantity: u32,
}

impl CartLine {
    /// Price times quantity, clamped at the largest representable amount.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.checked_mul(self.quantity).unwrap_or(Price::MAX)
    }
}

/// Clamp a requested quantity into `[1, stock]`.
///
/// Returns 0 when the product has no sellable stock. The quantity stepper
/// runs every change through this, so a request can never exceed what is
/// available at render time.
#[must_use]
pub fn clamp_quantity(requested: i64, stock: i64) -> u32 {
    if stock < 1 {
        return 0;
    }
    u32::try_from(requested.clamp(1, stock)).unwrap_or(u32::MAX)
}

/// Client-local cart that survives process restarts.
///
/// Loaded once at startup with [`CartLedger::load`]; afterwards every
/// mutating call rewrites the whole line set through the storage slot, so
/// the persisted cart never lags the in-memory one.
pub struct CartLedger {
    lines: Vec<CartLine>,
    storage: Box<dyn CartStorage>,
}

impl CartLedger {
    /// Load the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the slot cannot be read and
    /// [`CartError::Corrupt`] if its content does not decode.
    pub fn load(storage: Box<dyn CartStorage>) -> Result<Self, CartError> {
        let lines = storage.load()?;
        debug!(lines = lines.len(), "cart loaded");
        Ok(Self { lines, storage })
    }

    /// Add `quantity` units of `product`, merging into an existing line.
    ///
    /// The merged quantity is clamped to the product's stock as of this
    /// call, so stale lines shrink back into range when stock has dropped
    /// since they were added.
    ///
    /// # Errors
    ///
    /// Rejects a zero `quantity` and products with no sellable stock;
    /// otherwise fails only if persisting the updated cart fails.
    pub fn add_or_merge(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if !product.in_stock() {
            return Err(CartError::OutOfStock {
                name: product.name.clone(),
            });
        }
        let stock_bound = u32::try_from(product.stock).unwrap_or(u32::MAX);

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product.id)
        {
            line.quantity = line.quantity.saturating_add(quantity).min(stock_bound);
        } else {
            self.lines.push(CartLine {
                product_id: product.id.clone(),
                name: product.name.clone(),
                price: product.price,
                image: product.image.clone(),
                quantity: quantity.min(stock_bound),
            });
        }
        self.persist()
    }

    /// Remove the line for `product_id`. Absent lines are a no-op.
    ///
    /// # Errors
    ///
    /// Fails only if persisting the updated cart fails.
    pub fn remove(&mut self, product_id: &ProductId) -> Result<(), CartError> {
        let before = self.lines.len();
        self.lines.retain(|line| &line.product_id != product_id);
        if self.lines.len() == before {
            return Ok(());
        }
        self.persist()
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Fails only if persisting the empty cart fails.
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.lines.clear();
        self.persist()
    }

    /// Sum over lines of price times quantity.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines
            .iter()
            .fold(Price::ZERO, |total, line| {
                total.saturating_add(line.line_total())
            })
    }

    /// Total units across all lines (the badge count, not the line count).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Current lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct product lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    fn persist(&self) -> Result<(), CartError> {
        self.storage.save(&self.lines)
    }
}

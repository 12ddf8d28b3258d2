//! Unified error handling for the storefront.
//!
//! Provides a single `StorefrontError` that the shell embedding this crate
//! can match on, plus buyer-safe display text. Internal detail stays in the
//! logs; the buyer sees a short message they can act on.

use thiserror::Error;
use warung_store::StoreError;

use crate::cart::CartError;
use crate::checkout::PurchaseError;
use crate::config::ConfigError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Document store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// A purchase did not complete.
    #[error("Purchase error: {0}")]
    Purchase(#[from] PurchaseError),

    /// Configuration failed to load.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl StorefrontError {
    /// Short message safe to show a buyer.
    ///
    /// Store and configuration detail never reaches the buyer; cart and
    /// purchase problems map to the storefront's usual alert texts.
    #[must_use]
    pub fn buyer_message(&self) -> String {
        match self {
            Self::Cart(CartError::OutOfStock { .. }) => {
                "Sorry, this product is out of stock!".to_string()
            }
            Self::Cart(CartError::ZeroQuantity) => {
                "Please choose at least one item.".to_string()
            }
            Self::Cart(_) => "Your cart could not be saved. Please try again.".to_string(),
            Self::Purchase(PurchaseError::CartNotCleared { .. }) => {
                "Order placed, but your cart could not be emptied.".to_string()
            }
            Self::Purchase(_) => "Failed to place order. Please try again.".to_string(),
            Self::Store(_) | Self::Config(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storefront_error_display() {
        let err = StorefrontError::Store(StoreError::NotFound("products/abc".to_string()));
        assert_eq!(err.to_string(), "Store error: not found: products/abc");

        let err = StorefrontError::Cart(CartError::ZeroQuantity);
        assert_eq!(err.to_string(), "Cart error: quantity must be at least 1");
    }

    #[test]
    fn test_buyer_message_hides_store_detail() {
        let err = StorefrontError::Store(StoreError::Api {
            status: 403,
            message: "permission denied for warung-prod".to_string(),
        });

        let message = err.buyer_message();
        assert!(!message.contains("warung-prod"));
        assert_eq!(message, "Something went wrong. Please try again.");
    }

    #[test]
    fn test_buyer_message_for_out_of_stock() {
        let err = StorefrontError::Cart(CartError::OutOfStock {
            name: "Bandeng Presto".to_string(),
        });
        assert_eq!(err.buyer_message(), "Sorry, this product is out of stock!");
    }
}

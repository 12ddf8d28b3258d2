//! Warung storefront library.
//!
//! Buyer-side core for the warung: the product catalog, the client-local
//! cart ledger, and order intake. A shell (desktop, terminal, or web) wires
//! these against a [`warung_store::DocumentStore`] and renders the results.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod storage;

pub use cart::{CartError, CartLedger, CartLine, clamp_quantity};
pub use catalog::Catalog;
pub use checkout::{Checkout, PlacedOrder, PurchaseError, PurchaseLine};
pub use config::{ConfigError, StorefrontConfig};
pub use error::StorefrontError;
pub use storage::{CartStorage, JsonFileStorage, MemoryStorage};

//! Warung console library.
//!
//! Seller-side core for the warung: the live order watch with its
//! session-relative new-order alerts, the order desk, product
//! administration, and the startup connection probe. A shell wires these
//! against a [`warung_store::DocumentStore`] and renders the events.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod connection;
pub mod error;
pub mod orders;
pub mod products;
pub mod watch;

pub use config::{ConfigError, ConsoleConfig};
pub use connection::verify_connection;
pub use error::ConsoleError;
pub use orders::OrderDesk;
pub use products::{
    CatalogStats, ProductEvent, ProductForm, ProductFormError, ProductInput, ProductManager,
    ProductWatchHandle, spawn_product_watch,
};
pub use watch::{OrderEvent, OrderWatch, OrderWatchHandle, WatchUpdate, spawn_order_watch};

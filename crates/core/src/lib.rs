//! Warung Core - Shared domain types.
//!
//! This crate provides the types shared by the two Warung applications:
//! - `storefront` - the buyer-facing side (catalog, cart, checkout)
//! - `console` - the seller-facing side (product admin, order intake)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no store access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, statuses, and the stored document
//!   shapes for products and orders
//! - [`collections`] - Names of the collections both applications share

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod collections;
pub mod types;

pub use types::*;

//! Core types for Warung.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;

pub use id::*;
pub use order::Order;
pub use price::{Price, PriceError};
pub use product::Product;
pub use status::*;

//! Names of the document collections both applications read and write.

/// Catalog products, one document per product.
pub const PRODUCTS: &str = "products";

/// Placed orders, one document per purchased line.
pub const ORDERS: &str = "orders";

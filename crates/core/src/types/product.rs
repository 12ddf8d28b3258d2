//! Catalog product as stored in the document database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::ProductId;
use crate::types::price::Price;

/// One product in the catalog.
///
/// Field names mirror the stored document (camelCase on the wire). The id
/// is the document id and is injected when a stored document is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    /// Units left. Can go negative when concurrent purchases race; the
    /// store decrements without a floor.
    #[serde(default)]
    pub stock: i64,
    /// Image URL shown on product cards; may be empty.
    #[serde(default)]
    pub image: String,
    /// Stamped by the backend on create; `None` until the server echoes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Stamped by the backend on every create and edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether at least one unit can still be sold.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

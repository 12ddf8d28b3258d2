//! Customer order as stored in the document database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::{OrderId, ProductId};
use crate::types::price::Price;
use crate::types::status::OrderStatus;

/// One placed order.
///
/// Every purchased line becomes its own order document; a checkout with
/// three cart lines produces three orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub product_id: ProductId,
    /// Product name at purchase time; later renames do not rewrite it.
    pub product_name: String,
    pub quantity: u32,
    /// Unit price times quantity, captured at purchase time.
    pub total_price: Price,
    #[serde(default)]
    pub status: OrderStatus,
    /// Stamped by the backend at insert; `None` until the server echoes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Stamped each time the seller completes the order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Whether the order still awaits the seller.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.status.is_pending()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_stored_document() {
        let order: Order = serde_json::from_value(json!({
            "id": "jcstPSPGRMdIFBGzBNXS",
            "productId": "b00Qni3q9NO4xSGdviZA",
            "productName": "Bandeng Presto",
            "quantity": 3,
            "totalPrice": 135000.0,
            "status": "pending",
            "createdAt": "2025-11-03T09:15:42.123456Z",
        }))
        .unwrap();

        assert_eq!(order.quantity, 3);
        assert_eq!(order.total_price, Price::parse("135000").unwrap());
        assert!(order.is_pending());
        assert!(order.completed_at.is_none());
    }

    #[test]
    fn test_completed_order() {
        let order: Order = serde_json::from_value(json!({
            "id": "o1",
            "productId": "p1",
            "productName": "Lumpia",
            "quantity": 1,
            "totalPrice": 20000,
            "status": "completed",
            "createdAt": "2025-11-03T09:15:42Z",
            "completedAt": "2025-11-03T11:00:00Z",
        }))
        .unwrap();

        assert!(!order.is_pending());
        assert!(order.completed_at.unwrap() > order.created_at.unwrap());
    }

    #[test]
    fn test_status_defaults_to_pending() {
        let order: Order = serde_json::from_value(json!({
            "id": "o1",
            "productId": "p1",
            "productName": "Lumpia",
            "quantity": 2,
            "totalPrice": 40000,
        }))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
    }
}

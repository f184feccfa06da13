//! Service price list and per-visit orders
//!
//! `ServiceOrder` snapshots the unit price at order time; later price-list
//! changes never alter placed orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Price-list entry (spa, room service, laundry, transfer, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// Unique identifier
    pub id: i32,

    /// Unique upper-cased code, e.g. SPA or ROOM_SERVICE
    pub code: String,

    /// Display title
    pub title: String,

    /// Current price per unit
    pub base_price: Decimal,

    /// Whether the service is offered in the current price list
    pub is_active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Service {
    pub fn new(code: String, title: String, base_price: Decimal) -> Self {
        Self {
            id: 0,
            code: code.to_uppercase(),
            title,
            base_price,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// Service order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceOrderStatus {
    /// Placed, not yet delivered
    #[default]
    Pending,
    /// Delivered; counts toward the visit's services amount
    Completed,
    /// Cancelled before delivery
    Canceled,
}

impl fmt::Display for ServiceOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceOrderStatus::Pending => write!(f, "pending"),
            ServiceOrderStatus::Completed => write!(f, "completed"),
            ServiceOrderStatus::Canceled => write!(f, "canceled"),
        }
    }
}

impl ServiceOrderStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(ServiceOrderStatus::Pending),
            "completed" => Some(ServiceOrderStatus::Completed),
            "canceled" => Some(ServiceOrderStatus::Canceled),
            _ => None,
        }
    }
}

/// A purchased service tied to a visit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOrder {
    /// Unique identifier
    pub id: i32,

    /// Owning visit
    pub visit_id: i32,

    /// Ordered service
    pub service_id: i32,

    /// Quantity, at least 1
    pub quantity: i32,

    /// Unit price snapshot taken at order time
    pub unit_price: Decimal,

    /// Current status
    pub status: ServiceOrderStatus,

    /// Optional note from the guest or staff
    pub note: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ServiceOrder {
    /// Place an order, coercing the quantity to at least 1 and snapshotting
    /// the unit price.
    pub fn new(
        visit_id: i32,
        service_id: i32,
        quantity: i32,
        unit_price: Decimal,
        note: Option<String>,
    ) -> Self {
        Self {
            id: 0,
            visit_id,
            service_id,
            quantity: quantity.max(1),
            unit_price,
            status: ServiceOrderStatus::Pending,
            note,
            created_at: Utc::now(),
        }
    }

    /// Order subtotal: quantity x unit price, rounded to 2 decimal places
    pub fn subtotal(&self) -> Decimal {
        (Decimal::from(self.quantity) * self.unit_price).round_dp(2)
    }

    /// Mark the order delivered. Returns false if it was cancelled already.
    pub fn complete(&mut self) -> bool {
        if self.status == ServiceOrderStatus::Canceled {
            return false;
        }
        self.status = ServiceOrderStatus::Completed;
        true
    }

    /// Cancel the order. Completed orders cannot be cancelled.
    pub fn cancel(&mut self) -> bool {
        if self.status == ServiceOrderStatus::Completed {
            return false;
        }
        self.status = ServiceOrderStatus::Canceled;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quantity_coerced_to_one() {
        let order = ServiceOrder::new(1, 1, 0, dec!(500), None);
        assert_eq!(order.quantity, 1);
        let order = ServiceOrder::new(1, 1, -3, dec!(500), None);
        assert_eq!(order.quantity, 1);
    }

    #[test]
    fn test_subtotal_rounds_to_cents() {
        let order = ServiceOrder::new(1, 1, 3, dec!(33.333), None);
        assert_eq!(order.subtotal(), dec!(100.00));

        let order = ServiceOrder::new(1, 1, 2, dec!(500), None);
        assert_eq!(order.subtotal(), dec!(1000));
    }

    #[test]
    fn test_completed_order_cannot_be_cancelled() {
        let mut order = ServiceOrder::new(1, 1, 1, dec!(500), None);
        assert!(order.complete());
        assert!(!order.cancel());
        assert_eq!(order.status, ServiceOrderStatus::Completed);
    }

    #[test]
    fn test_cancelled_order_cannot_be_completed() {
        let mut order = ServiceOrder::new(1, 1, 1, dec!(500), None);
        assert!(order.cancel());
        assert!(!order.complete());
        assert_eq!(order.status, ServiceOrderStatus::Canceled);
    }

    #[test]
    fn test_code_uppercased() {
        let svc = Service::new("spa".to_string(), "Spa access".to_string(), dec!(1500));
        assert_eq!(svc.code, "SPA");
    }
}

//! Guest registry and visit tracking
//!
//! A `GuestVisit` is the factual record of occupancy: created exactly once at
//! check-in, closed exactly once at check-out. Planned dates live on the
//! booking; the visit carries real timestamps and the settled amounts.

use crate::models::service::{ServiceOrder, ServiceOrderStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Guest identity, independent of any single booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guest {
    /// Unique identifier
    pub id: i32,

    /// First name
    pub first_name: String,

    /// Last name
    pub last_name: String,

    /// Phone number
    pub phone: Option<String>,

    /// Email (duplicates allowed; families share addresses)
    pub email: Option<String>,

    /// Passport or ID document number
    pub doc_number: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Guest {
    pub fn new(
        first_name: String,
        last_name: String,
        phone: Option<String>,
        email: Option<String>,
        doc_number: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            first_name,
            last_name,
            phone,
            email,
            doc_number,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full name for display
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

/// Factual occupancy record, 1:1 with a booking
///
/// `total_amount` is only authoritative once `checkout_at` is set; while the
/// visit is open it reflects the most recent explicit recalculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestVisit {
    /// Unique identifier
    pub id: i32,

    /// Guest who stayed
    pub guest_id: i32,

    /// Originating booking (unique per booking)
    pub booking_id: i32,

    /// Room occupied, copied from the booking at check-in
    pub room_id: Option<i32>,

    /// Actual check-in time
    pub checkin_at: DateTime<Utc>,

    /// Actual check-out time; None while the visit is open
    pub checkout_at: Option<DateTime<Utc>>,

    /// Lodging cost snapshot taken from the booking at check-in
    pub base_amount: Decimal,

    /// Sum of completed service orders
    pub services_amount: Decimal,

    /// base_amount + services_amount, fixed at check-out
    pub total_amount: Decimal,
}

impl GuestVisit {
    /// Open a visit at check-in
    pub fn open(guest_id: i32, booking_id: i32, room_id: Option<i32>, base_amount: Decimal) -> Self {
        Self {
            id: 0,
            guest_id,
            booking_id,
            room_id,
            checkin_at: Utc::now(),
            checkout_at: None,
            base_amount,
            services_amount: Decimal::ZERO,
            total_amount: base_amount,
        }
    }

    /// Whether the visit has not been checked out yet
    pub fn is_open(&self) -> bool {
        self.checkout_at.is_none()
    }

    /// Recompute `services_amount` from the visit's orders and refresh
    /// `total_amount`. Only completed orders count. Idempotent; safe to call
    /// at any point in the visit's life, not only at check-out.
    pub fn recalc_totals(&mut self, orders: &[ServiceOrder]) {
        self.services_amount = orders
            .iter()
            .filter(|o| o.status == ServiceOrderStatus::Completed)
            .map(|o| o.subtotal())
            .sum();
        self.total_amount = self.base_amount + self.services_amount;
    }

    /// Close the visit. Returns false if it was already closed.
    pub fn close(&mut self, now: DateTime<Utc>) -> bool {
        if self.checkout_at.is_some() {
            return false;
        }
        self.checkout_at = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(quantity: i32, unit_price: Decimal, status: ServiceOrderStatus) -> ServiceOrder {
        let mut o = ServiceOrder::new(1, 1, quantity, unit_price, None);
        o.status = status;
        o
    }

    #[test]
    fn test_pending_orders_do_not_count() {
        let mut visit = GuestVisit::open(1, 1, Some(1), dec!(9000));
        let orders = vec![order(2, dec!(500), ServiceOrderStatus::Pending)];

        visit.recalc_totals(&orders);
        assert_eq!(visit.services_amount, dec!(0));
        assert_eq!(visit.total_amount, dec!(9000));
    }

    #[test]
    fn test_completed_orders_accumulate() {
        let mut visit = GuestVisit::open(1, 1, Some(1), dec!(9000));
        let orders = vec![
            order(2, dec!(500), ServiceOrderStatus::Completed),
            order(1, dec!(1200), ServiceOrderStatus::Canceled),
            order(3, dec!(100), ServiceOrderStatus::Completed),
        ];

        visit.recalc_totals(&orders);
        assert_eq!(visit.services_amount, dec!(1300));
        assert_eq!(visit.total_amount, dec!(10300));
    }

    #[test]
    fn test_recalc_is_idempotent() {
        let mut visit = GuestVisit::open(1, 1, Some(1), dec!(5000));
        let orders = vec![order(2, dec!(500), ServiceOrderStatus::Completed)];

        visit.recalc_totals(&orders);
        let first = (visit.services_amount, visit.total_amount);
        visit.recalc_totals(&orders);
        assert_eq!((visit.services_amount, visit.total_amount), first);
    }

    #[test]
    fn test_visit_closes_once() {
        let mut visit = GuestVisit::open(1, 1, None, dec!(5000));
        assert!(visit.is_open());
        assert!(visit.close(Utc::now()));
        assert!(!visit.is_open());
        assert!(!visit.close(Utc::now()));
    }
}

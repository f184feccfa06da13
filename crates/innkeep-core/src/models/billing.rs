//! Billing models: bills, line items, and payments
//!
//! A bill's derived fields (subtotal, tax, total, status) are stored and
//! mutated in place. Adding an item does NOT refresh totals; callers must
//! trigger `recalc_totals` explicitly, so staleness is observable between
//! the two steps. Payments apply incrementally to `paid_amount`, which the
//! storage layer keeps equal to the sum of payment rows.

use crate::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bill status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    /// No money received yet
    #[default]
    Open,
    /// Some money received, less than the total
    PartiallyPaid,
    /// Fully paid
    Paid,
    /// Explicitly cancelled; terminal and excluded from derivation
    Cancelled,
    /// Fully refunded
    Refunded,
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillStatus::Open => write!(f, "open"),
            BillStatus::PartiallyPaid => write!(f, "partially_paid"),
            BillStatus::Paid => write!(f, "paid"),
            BillStatus::Cancelled => write!(f, "cancelled"),
            BillStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl BillStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(BillStatus::Open),
            "partially_paid" => Some(BillStatus::PartiallyPaid),
            "paid" => Some(BillStatus::Paid),
            "cancelled" => Some(BillStatus::Cancelled),
            "refunded" => Some(BillStatus::Refunded),
            _ => None,
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            BillStatus::Open => "Open",
            BillStatus::PartiallyPaid => "Partially paid",
            BillStatus::Paid => "Paid",
            BillStatus::Cancelled => "Cancelled",
            BillStatus::Refunded => "Refunded",
        }
    }
}

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Online,
    Transfer,
    /// Negative payments created by refund approval
    Refund,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Online => write!(f, "online"),
            PaymentMethod::Transfer => write!(f, "transfer"),
            PaymentMethod::Refund => write!(f, "refund"),
        }
    }
}

impl PaymentMethod {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "online" => Some(PaymentMethod::Online),
            "transfer" => Some(PaymentMethod::Transfer),
            "refund" => Some(PaymentMethod::Refund),
            _ => None,
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::Online => "Online",
            PaymentMethod::Transfer => "Bank transfer",
            PaymentMethod::Refund => "Refund",
        }
    }
}

/// One billable line on a bill
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// quantity x unit_price, computed when the line is appended
    pub total: Decimal,
}

impl BillItem {
    pub fn new(description: String, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            description,
            quantity,
            unit_price,
            total: quantity * unit_price,
        }
    }
}

/// Financial document, optionally linked to a booking (walk-in sales allowed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    /// Unique identifier
    pub id: i32,

    /// Guest name snapshot
    pub guest_name: String,

    /// Guest contact snapshot (phone or email)
    pub guest_contact: String,

    /// Linked booking, if any
    pub booking_id: Option<i32>,

    /// Staff member who created the bill
    pub created_by: i32,

    /// Ordered line items
    pub items: Vec<BillItem>,

    /// Sum of item totals, as of the last recalculation
    pub subtotal: Decimal,

    /// Tax amount, as of the last recalculation
    pub tax: Decimal,

    /// Flat discount amount
    pub discount: Decimal,

    /// subtotal + tax - discount
    pub total: Decimal,

    /// Running sum of applied payments (refunds are negative)
    pub paid_amount: Decimal,

    /// Current status
    pub status: BillStatus,

    /// Free-form notes
    pub notes: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// Create an empty open bill
    pub fn new(
        guest_name: String,
        guest_contact: String,
        created_by: i32,
        booking_id: Option<i32>,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            guest_name,
            guest_contact,
            booking_id,
            created_by,
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            status: BillStatus::Open,
            notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a line item. Totals stay stale until `recalc_totals`.
    pub fn add_item(&mut self, description: String, quantity: Decimal, unit_price: Decimal) {
        self.items.push(BillItem::new(description, quantity, unit_price));
        self.updated_at = Utc::now();
    }

    /// Remove a line item by position. Returns false when out of range.
    pub fn remove_item(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.items.remove(index);
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    /// Recompute subtotal/tax/total and re-derive the status.
    ///
    /// `tax_percent` must be supplied by the caller (the boundary threads the
    /// configured default through). A `None` discount keeps the previous
    /// discount amount.
    pub fn recalc_totals(&mut self, tax_percent: Decimal, discount_amount: Option<Decimal>) {
        self.subtotal = self.items.iter().map(|i| i.total).sum();
        self.tax = self.subtotal * tax_percent / Decimal::from(100);
        if let Some(discount) = discount_amount {
            self.discount = discount;
        }
        self.total = self.subtotal + self.tax - self.discount;
        self.derive_status();
        self.updated_at = Utc::now();
    }

    /// Apply a signed payment amount (negative = refund) and re-derive status
    pub fn apply_payment(&mut self, amount: Decimal) {
        self.paid_amount += amount;
        self.derive_status();
        self.updated_at = Utc::now();
    }

    /// Status is a pure function of paid_amount vs total, except that an
    /// explicit cancellation is sticky.
    fn derive_status(&mut self) {
        if self.status == BillStatus::Cancelled {
            return;
        }
        self.status = if self.paid_amount <= Decimal::ZERO {
            BillStatus::Open
        } else if self.paid_amount < self.total {
            BillStatus::PartiallyPaid
        } else {
            BillStatus::Paid
        };
    }

    /// Cancel the bill. Paid and refunded bills cannot be cancelled.
    pub fn cancel(&mut self) -> bool {
        if matches!(self.status, BillStatus::Paid | BillStatus::Refunded) {
            return false;
        }
        self.status = BillStatus::Cancelled;
        self.updated_at = Utc::now();
        true
    }

    /// Validate a refund request. The amount must be positive and must not
    /// exceed what has actually been paid so far.
    pub fn check_refund(&self, amount: Decimal) -> AppResult<()> {
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "refund amount must be positive".to_string(),
            ));
        }
        if amount > self.paid_amount {
            return Err(AppError::RefundExceedsPaid {
                requested: amount,
                paid: self.paid_amount,
            });
        }
        Ok(())
    }

    /// Outstanding amount, never negative
    pub fn balance(&self) -> Decimal {
        (self.total - self.paid_amount).max(Decimal::ZERO)
    }
}

/// Signed monetary transaction against a bill
///
/// Positive amounts are payments received, negative amounts are refunds.
/// Always attributed to the staff member who recorded it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: i32,

    /// Bill this payment settles
    pub bill_id: i32,

    /// Signed amount
    pub amount: Decimal,

    /// Payment method
    pub method: PaymentMethod,

    /// Staff member who recorded the payment
    pub received_by: i32,

    /// Transaction/receipt reference
    pub reference: Option<String>,

    /// Free-form notes
    pub notes: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        bill_id: i32,
        amount: Decimal,
        method: PaymentMethod,
        received_by: i32,
        reference: Option<String>,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: 0,
            bill_id,
            amount,
            method,
            received_by,
            reference,
            notes,
            created_at: Utc::now(),
        }
    }

    /// Whether this payment is a refund
    pub fn is_refund(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn bill() -> Bill {
        Bill::new(
            "Anna Koval".to_string(),
            "+7-900-000-00-00".to_string(),
            1,
            None,
            None,
        )
    }

    #[test]
    fn test_totals_stale_until_recalc() {
        let mut b = bill();
        b.add_item("Breakfast".to_string(), dec!(3), dec!(350));
        // add_item does not touch totals
        assert_eq!(b.subtotal, dec!(0));
        assert_eq!(b.total, dec!(0));

        b.recalc_totals(dec!(10), None);
        assert_eq!(b.subtotal, dec!(1050));
        assert_eq!(b.tax, dec!(105));
        assert_eq!(b.discount, dec!(0));
        assert_eq!(b.total, dec!(1155));
    }

    #[test]
    fn test_invariant_total_equals_subtotal_plus_tax_minus_discount() {
        let mut b = bill();
        b.add_item("Lodging".to_string(), dec!(3), dec!(3000));
        b.add_item("Minibar".to_string(), dec!(2), dec!(450));
        b.recalc_totals(dec!(10), Some(dec!(500)));
        assert_eq!(b.total, b.subtotal + b.tax - b.discount);

        // recalc with a different rate keeps the invariant
        b.recalc_totals(dec!(20), None);
        assert_eq!(b.discount, dec!(500));
        assert_eq!(b.total, b.subtotal + b.tax - b.discount);
    }

    #[test]
    fn test_payment_progression() {
        let mut b = bill();
        b.add_item("Breakfast".to_string(), dec!(3), dec!(350));
        b.recalc_totals(dec!(10), None);
        assert_eq!(b.total, dec!(1155));

        b.apply_payment(dec!(500));
        assert_eq!(b.paid_amount, dec!(500));
        assert_eq!(b.status, BillStatus::PartiallyPaid);

        b.apply_payment(dec!(655));
        assert_eq!(b.paid_amount, dec!(1155));
        assert_eq!(b.status, BillStatus::Paid);
        assert_eq!(b.balance(), dec!(0));
    }

    #[test]
    fn test_refund_reopens_status() {
        let mut b = bill();
        b.add_item("Spa".to_string(), dec!(1), dec!(1000));
        b.recalc_totals(dec!(0), None);
        b.apply_payment(dec!(1000));
        assert_eq!(b.status, BillStatus::Paid);

        b.apply_payment(dec!(-1000));
        assert_eq!(b.paid_amount, dec!(0));
        assert_eq!(b.status, BillStatus::Open);
    }

    #[test]
    fn test_cancellation_is_sticky() {
        let mut b = bill();
        b.add_item("Spa".to_string(), dec!(1), dec!(1000));
        b.recalc_totals(dec!(0), None);
        assert!(b.cancel());
        assert_eq!(b.status, BillStatus::Cancelled);

        // neither payments nor recalcs resurrect a cancelled bill
        b.apply_payment(dec!(1000));
        assert_eq!(b.status, BillStatus::Cancelled);
        b.recalc_totals(dec!(10), None);
        assert_eq!(b.status, BillStatus::Cancelled);
    }

    #[test]
    fn test_paid_bill_cannot_be_cancelled() {
        let mut b = bill();
        b.add_item("Spa".to_string(), dec!(1), dec!(1000));
        b.recalc_totals(dec!(0), None);
        b.apply_payment(dec!(1000));
        assert!(!b.cancel());
        assert_eq!(b.status, BillStatus::Paid);
    }

    #[test]
    fn test_remove_item_by_position() {
        let mut b = bill();
        b.add_item("A".to_string(), dec!(1), dec!(100));
        b.add_item("B".to_string(), dec!(1), dec!(200));
        assert!(b.remove_item(0));
        assert_eq!(b.items.len(), 1);
        assert_eq!(b.items[0].description, "B");
        assert!(!b.remove_item(5));
    }

    #[test]
    fn test_overpayment_keeps_balance_at_zero() {
        let mut b = bill();
        b.add_item("Spa".to_string(), dec!(1), dec!(1000));
        b.recalc_totals(dec!(0), None);
        b.apply_payment(dec!(1500));
        assert_eq!(b.status, BillStatus::Paid);
        assert_eq!(b.balance(), dec!(0));
    }

    #[test]
    fn test_paid_amount_equals_sum_of_applied_payments() {
        let mut b = bill();
        b.add_item("Lodging".to_string(), dec!(3), dec!(3000));
        b.recalc_totals(dec!(10), None);

        let amounts = [dec!(500), dec!(2500), dec!(-100), dec!(655)];
        for a in amounts {
            b.apply_payment(a);
        }
        let expected: Decimal = amounts.iter().copied().sum();
        assert_eq!(b.paid_amount, expected);
    }

    #[test]
    fn test_refund_bound() {
        let mut b = bill();
        b.add_item("Spa".to_string(), dec!(1), dec!(1000));
        b.recalc_totals(dec!(0), None);
        b.apply_payment(dec!(600));

        assert!(b.check_refund(dec!(600)).is_ok());
        assert!(b.check_refund(dec!(1)).is_ok());
        assert!(matches!(
            b.check_refund(dec!(601)),
            Err(AppError::RefundExceedsPaid { .. })
        ));
        assert!(matches!(
            b.check_refund(dec!(0)),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            b.check_refund(dec!(-50)),
            Err(AppError::InvalidInput(_))
        ));

        // one unit over the paid amount is still rejected on a paid bill
        b.apply_payment(dec!(400));
        assert_eq!(b.status, BillStatus::Paid);
        assert!(matches!(
            b.check_refund(b.paid_amount + dec!(1)),
            Err(AppError::RefundExceedsPaid { .. })
        ));
        assert!(b.check_refund(b.paid_amount).is_ok());
    }

    proptest! {
        #[test]
        fn prop_refund_allowed_iff_within_paid(paid in 0u32..1_000_000, requested in 1u32..2_000_000) {
            let mut b = bill();
            b.add_item("Lodging".to_string(), dec!(1), Decimal::from(2_000_000u32));
            b.recalc_totals(dec!(0), None);
            b.apply_payment(Decimal::from(paid));

            let result = b.check_refund(Decimal::from(requested));
            prop_assert_eq!(result.is_ok(), requested <= paid);
        }
    }

    #[test]
    fn test_payment_sign() {
        let p = Payment::new(1, dec!(-200), PaymentMethod::Refund, 1, None, None);
        assert!(p.is_refund());
        let p = Payment::new(1, dec!(200), PaymentMethod::Cash, 1, None, None);
        assert!(!p.is_refund());
    }
}

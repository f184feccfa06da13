//! Booking model and reservation state machine
//!
//! A booking's lifecycle:
//! 1. Created pending with the total price captured once
//! 2. Confirmed by staff
//! 3. Checked in (opens a visit), checked out (closes it)
//! 4. Cancellable from any non-terminal state

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, awaiting confirmation
    #[default]
    Pending,
    /// Confirmed by staff, occupies the room's calendar
    Confirmed,
    /// Guest is on site
    CheckedIn,
    /// Stay finished
    CheckedOut,
    /// Cancelled before completion
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::CheckedIn => write!(f, "checked_in"),
            BookingStatus::CheckedOut => write!(f, "checked_out"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl BookingStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "checked_in" => Some(BookingStatus::CheckedIn),
            "checked_out" => Some(BookingStatus::CheckedOut),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::CheckedIn => "Checked in",
            BookingStatus::CheckedOut => "Checked out",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    /// Active bookings occupy the room for availability purposes
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::CheckedIn)
    }

    /// Terminal states cannot be cancelled
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::CheckedOut | BookingStatus::Cancelled)
    }
}

/// Booking entity
///
/// The guest contact fields are a snapshot taken at creation; `guest_id`
/// optionally links to the guest registry and is required before check-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    /// Unique identifier
    pub id: i32,

    /// Booked room
    pub room_id: i32,

    /// Guest name snapshot
    pub guest_name: String,

    /// Guest phone snapshot
    pub guest_phone: String,

    /// Guest email snapshot
    pub guest_email: Option<String>,

    /// Linked guest identity (required for check-in)
    pub guest_id: Option<i32>,

    /// Planned arrival date
    pub check_in: NaiveDate,

    /// Planned departure date
    pub check_out: NaiveDate,

    /// Total price, captured once at construction
    pub total_price: Decimal,

    /// Current status
    pub status: BookingStatus,

    /// Special requests from the guest
    pub special_requests: Option<String>,

    /// Staff notes
    pub notes: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Create a pending booking, capturing the total price from the room's
    /// current nightly rate.
    ///
    /// Date ordering is the caller's responsibility; a non-positive raw night
    /// count is floored to one night rather than rejected here.
    pub fn new(
        room_id: i32,
        guest_name: String,
        guest_phone: String,
        guest_email: Option<String>,
        check_in: NaiveDate,
        check_out: NaiveDate,
        price_per_night: Decimal,
    ) -> Self {
        let now = Utc::now();
        let nights = (check_out - check_in).num_days().max(1);
        Self {
            id: 0,
            room_id,
            guest_name,
            guest_phone,
            guest_email,
            guest_id: None,
            check_in,
            check_out,
            total_price: price_per_night * Decimal::from(nights),
            status: BookingStatus::Pending,
            special_requests: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of nights between the planned dates, floored to one
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days().max(1)
    }

    /// Confirm a pending booking. Returns false without mutation otherwise.
    pub fn confirm(&mut self) -> bool {
        if self.status == BookingStatus::Pending {
            self.status = BookingStatus::Confirmed;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    /// Move a confirmed booking to checked-in. Returns false otherwise.
    pub fn check_in_guest(&mut self) -> bool {
        if self.status == BookingStatus::Confirmed {
            self.status = BookingStatus::CheckedIn;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    /// Move a checked-in booking to checked-out. Returns false otherwise.
    pub fn check_out_guest(&mut self) -> bool {
        if self.status == BookingStatus::CheckedIn {
            self.status = BookingStatus::CheckedOut;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    /// Cancel from any non-terminal state. Returns false otherwise.
    pub fn cancel(&mut self) -> bool {
        if !self.status.is_terminal() {
            self.status = BookingStatus::Cancelled;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    /// Whether the visit-opening flow may check this booking in: confirmed
    /// and the planned arrival date has been reached.
    pub fn can_check_in(&self, today: NaiveDate) -> bool {
        self.status == BookingStatus::Confirmed && today >= self.check_in
    }

    /// Whether the booking can be checked out
    pub fn can_check_out(&self) -> bool {
        self.status == BookingStatus::CheckedIn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::room::dates_overlap;
    use chrono::Duration;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn booking(check_in: NaiveDate, check_out: NaiveDate, price: Decimal) -> Booking {
        Booking::new(
            1,
            "Anna Koval".to_string(),
            "+7-900-000-00-00".to_string(),
            None,
            check_in,
            check_out,
            price,
        )
    }

    #[test]
    fn test_total_price_captured_at_construction() {
        let today = Utc::now().date_naive();
        let b = booking(today + Duration::days(2), today + Duration::days(5), dec!(3000));
        assert_eq!(b.nights(), 3);
        assert_eq!(b.total_price, dec!(9000));
        assert_eq!(b.status, BookingStatus::Pending);
    }

    #[test]
    fn test_non_positive_range_floors_to_one_night() {
        let today = Utc::now().date_naive();
        let b = booking(today, today, dec!(3000));
        assert_eq!(b.nights(), 1);
        assert_eq!(b.total_price, dec!(3000));
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let today = Utc::now().date_naive();
        let mut b = booking(today, today + Duration::days(1), dec!(3000));

        assert!(b.confirm());
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert!(b.check_in_guest());
        assert_eq!(b.status, BookingStatus::CheckedIn);
        assert!(b.check_out_guest());
        assert_eq!(b.status, BookingStatus::CheckedOut);
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let today = Utc::now().date_naive();
        let mut b = booking(today, today + Duration::days(1), dec!(3000));

        // check-in before confirm fails, status unchanged
        assert!(!b.check_in_guest());
        assert_eq!(b.status, BookingStatus::Pending);
        assert!(!b.check_out_guest());
        assert_eq!(b.status, BookingStatus::Pending);

        // cannot confirm twice
        assert!(b.confirm());
        assert!(!b.confirm());
    }

    #[test]
    fn test_cancel_rules() {
        let today = Utc::now().date_naive();
        let mut b = booking(today, today + Duration::days(1), dec!(3000));
        assert!(b.cancel());
        assert_eq!(b.status, BookingStatus::Cancelled);
        // already cancelled
        assert!(!b.cancel());

        let mut done = booking(today, today + Duration::days(1), dec!(3000));
        done.confirm();
        done.check_in_guest();
        done.check_out_guest();
        assert!(!done.cancel());
        assert_eq!(done.status, BookingStatus::CheckedOut);
    }

    #[test]
    fn test_can_check_in_respects_start_date() {
        let today = Utc::now().date_naive();
        let mut future = booking(today + Duration::days(3), today + Duration::days(5), dec!(3000));
        future.confirm();
        assert!(!future.can_check_in(today));
        assert!(future.can_check_in(today + Duration::days(3)));

        let mut pending = booking(today, today + Duration::days(1), dec!(3000));
        assert!(!pending.can_check_in(today));
        pending.confirm();
        assert!(pending.can_check_in(today));
    }

    /// Acceptance model for one room: a candidate interval is accepted iff it
    /// overlaps no previously accepted interval. Accepted intervals must then
    /// be pairwise disjoint under half-open semantics.
    fn accept_bookings(candidates: &[(i64, i64)]) -> Vec<(NaiveDate, NaiveDate)> {
        let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut accepted: Vec<(NaiveDate, NaiveDate)> = Vec::new();
        for &(start, len) in candidates {
            let s = base + Duration::days(start);
            let e = s + Duration::days(len);
            if !accepted.iter().any(|&(a, b)| dates_overlap(a, b, s, e)) {
                accepted.push((s, e));
            }
        }
        accepted
    }

    proptest! {
        #[test]
        fn prop_no_two_accepted_bookings_overlap(
            candidates in prop::collection::vec((0i64..60, 1i64..14), 0..40)
        ) {
            let accepted = accept_bookings(&candidates);
            for i in 0..accepted.len() {
                for j in (i + 1)..accepted.len() {
                    let (a, b) = accepted[i];
                    let (c, d) = accepted[j];
                    prop_assert!(!dates_overlap(a, b, c, d));
                }
            }
        }
    }
}

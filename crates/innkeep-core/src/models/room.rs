//! Room inventory models
//!
//! Rooms carry a nightly price derived from their type. Availability against
//! a date range is answered with half-open interval semantics.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Room type enumeration
///
/// Each type maps to a display name and a base nightly price through
/// static lookups rather than per-instance fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    #[default]
    Standard,
    Deluxe,
    Suite,
    Family,
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl RoomType {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Some(RoomType::Standard),
            "deluxe" => Some(RoomType::Deluxe),
            "suite" => Some(RoomType::Suite),
            "family" => Some(RoomType::Family),
            _ => None,
        }
    }

    /// Stable code stored in the database
    pub fn code(&self) -> &'static str {
        match self {
            RoomType::Standard => "standard",
            RoomType::Deluxe => "deluxe",
            RoomType::Suite => "suite",
            RoomType::Family => "family",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            RoomType::Standard => "Standard",
            RoomType::Deluxe => "Deluxe",
            RoomType::Suite => "Suite",
            RoomType::Family => "Family",
        }
    }

    /// Base nightly price for this room type
    pub fn base_price(&self) -> Decimal {
        match self {
            RoomType::Standard => Decimal::new(3000, 0),
            RoomType::Deluxe => Decimal::new(5000, 0),
            RoomType::Suite => Decimal::new(8000, 0),
            RoomType::Family => Decimal::new(6000, 0),
        }
    }

    /// All known room types, for catalogs and filters
    pub fn all() -> [RoomType; 4] {
        [
            RoomType::Standard,
            RoomType::Deluxe,
            RoomType::Suite,
            RoomType::Family,
        ]
    }
}

/// Hotel room entity
///
/// The nightly price is derived from the room type at creation and again on
/// every type change. Bookings snapshot the price at their own creation, so
/// later room price changes never touch existing bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Unique identifier
    pub id: i32,

    /// Room number (unique across the hotel)
    pub number: String,

    /// Room type
    pub room_type: RoomType,

    /// Floor
    pub floor: i32,

    /// Capacity in persons
    pub capacity: i32,

    /// Nightly price, derived from the room type
    pub price_per_night: Decimal,

    /// Free-form description
    pub description: Option<String>,

    /// Whether the room is offered at all; an unavailable room never appears
    /// in search results regardless of date overlap
    pub is_available: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// Create a new room with the price derived from its type
    pub fn new(
        number: String,
        room_type: RoomType,
        floor: i32,
        capacity: i32,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            number,
            room_type,
            floor,
            capacity,
            price_per_night: room_type.base_price(),
            description,
            is_available: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Change the room type, re-deriving the nightly price
    pub fn set_type(&mut self, room_type: RoomType) {
        self.room_type = room_type;
        self.price_per_night = room_type.base_price();
        self.updated_at = Utc::now();
    }

    /// Total lodging price for a given number of nights
    pub fn total_for_nights(&self, nights: i64) -> Decimal {
        self.price_per_night * Decimal::from(nights)
    }
}

impl Default for Room {
    fn default() -> Self {
        Room::new(String::new(), RoomType::Standard, 1, 2, None)
    }
}

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`
/// overlap iff `a_start < b_end && b_start < a_end`.
///
/// Back-to-back stays (one ends the day the other begins) do not overlap.
pub fn dates_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && b_start < a_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_price_derived_from_type() {
        let room = Room::new("101".to_string(), RoomType::Standard, 1, 2, None);
        assert_eq!(room.price_per_night, dec!(3000));

        let suite = Room::new("501".to_string(), RoomType::Suite, 5, 4, None);
        assert_eq!(suite.price_per_night, dec!(8000));
    }

    #[test]
    fn test_set_type_rederives_price() {
        let mut room = Room::new("101".to_string(), RoomType::Standard, 1, 2, None);
        room.set_type(RoomType::Deluxe);
        assert_eq!(room.room_type, RoomType::Deluxe);
        assert_eq!(room.price_per_night, dec!(5000));
    }

    #[test]
    fn test_room_type_roundtrip() {
        for ty in RoomType::all() {
            assert_eq!(RoomType::from_str(ty.code()), Some(ty));
        }
        assert_eq!(RoomType::from_str("SUITE"), Some(RoomType::Suite));
        assert_eq!(RoomType::from_str("penthouse"), None);
    }

    #[test]
    fn test_dates_overlap_half_open() {
        // plain overlap
        assert!(dates_overlap(
            d("2025-03-01"),
            d("2025-03-05"),
            d("2025-03-03"),
            d("2025-03-07")
        ));
        // containment
        assert!(dates_overlap(
            d("2025-03-01"),
            d("2025-03-10"),
            d("2025-03-03"),
            d("2025-03-05")
        ));
        // back-to-back is not an overlap
        assert!(!dates_overlap(
            d("2025-03-01"),
            d("2025-03-05"),
            d("2025-03-05"),
            d("2025-03-08")
        ));
        // disjoint
        assert!(!dates_overlap(
            d("2025-03-01"),
            d("2025-03-02"),
            d("2025-03-10"),
            d("2025-03-12")
        ));
    }
}

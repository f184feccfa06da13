//! Staff accounts and role-based capabilities
//!
//! Authorization is a pure function of the role and, for bill management,
//! of the bill itself. The boundary resolves the acting staff member and
//! calls these predicates before touching storage.

use crate::models::billing::{Bill, BillStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Staff role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Housekeeping, kitchen, maintenance. No billing powers.
    #[default]
    Staff,
    /// Front desk. Creates and manages bills, records payments.
    Receptionist,
    /// Full access, including refund approval and reports.
    Manager,
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaffRole::Staff => write!(f, "staff"),
            StaffRole::Receptionist => write!(f, "receptionist"),
            StaffRole::Manager => write!(f, "manager"),
        }
    }
}

impl StaffRole {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "staff" => Some(StaffRole::Staff),
            "receptionist" => Some(StaffRole::Receptionist),
            "manager" => Some(StaffRole::Manager),
            _ => None,
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            StaffRole::Staff => "Staff",
            StaffRole::Receptionist => "Receptionist",
            StaffRole::Manager => "Manager",
        }
    }

    /// Privilege level for ordering comparisons
    pub fn level(&self) -> u8 {
        match self {
            StaffRole::Staff => 1,
            StaffRole::Receptionist => 2,
            StaffRole::Manager => 3,
        }
    }

    /// Whether this role may create bills and record payments at all
    pub fn can_handle_billing(&self) -> bool {
        matches!(self, StaffRole::Receptionist | StaffRole::Manager)
    }

    /// Whether this role may approve refunds
    pub fn can_approve_refund(&self) -> bool {
        matches!(self, StaffRole::Manager)
    }

    /// Whether this role may view aggregated reports
    pub fn can_view_reports(&self) -> bool {
        matches!(self, StaffRole::Manager)
    }
}

/// Staff account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    /// Unique identifier
    pub id: i32,

    /// Full name
    pub full_name: String,

    /// Unique email
    pub email: String,

    /// Contact phone
    pub phone: Option<String>,

    /// Role
    pub role: StaffRole,

    /// First day of employment
    pub hire_date: NaiveDate,

    /// Stamped on deactivation, cleared on reactivation
    pub termination_date: Option<NaiveDate>,

    /// Inactive accounts keep history but cannot act
    pub is_active: bool,

    /// Free-form notes
    pub notes: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Staff {
    pub fn new(
        full_name: String,
        email: String,
        role: StaffRole,
        phone: Option<String>,
        hire_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            full_name,
            email,
            phone,
            role,
            hire_date,
            termination_date: None,
            is_active: true,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this member may modify the given bill.
    ///
    /// Managers always may. Receptionists may touch their own bills in any
    /// state, and other people's bills only while those are not fully paid.
    /// Everyone else may not.
    pub fn can_manage_bill(&self, bill: &Bill) -> bool {
        if !self.is_active {
            return false;
        }
        match self.role {
            StaffRole::Manager => true,
            StaffRole::Receptionist => {
                bill.created_by == self.id || bill.status != BillStatus::Paid
            }
            StaffRole::Staff => false,
        }
    }

    /// Whether this member may approve refunds
    pub fn can_approve_refund(&self) -> bool {
        self.is_active && self.role.can_approve_refund()
    }

    /// Soft-deactivate, stamping the termination date. Returns false if
    /// already inactive.
    pub fn deactivate(&mut self, date: NaiveDate) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.termination_date = Some(date);
        self.updated_at = Utc::now();
        true
    }

    /// Reactivate a deactivated account, clearing the termination date.
    /// Returns false if already active.
    pub fn activate(&mut self) -> bool {
        if self.is_active {
            return false;
        }
        self.is_active = true;
        self.termination_date = None;
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn member(name: &str, email: &str, role: StaffRole) -> Staff {
        Staff::new(
            name.to_string(),
            email.to_string(),
            role,
            None,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
    }

    fn paid_bill(created_by: i32) -> Bill {
        let mut b = Bill::new(
            "Anna Koval".to_string(),
            "anna@example.com".to_string(),
            created_by,
            None,
            None,
        );
        b.add_item("Spa".to_string(), dec!(1), dec!(1000));
        b.recalc_totals(dec!(0), None);
        b.apply_payment(dec!(1000));
        assert_eq!(b.status, BillStatus::Paid);
        b
    }

    fn open_bill(created_by: i32) -> Bill {
        Bill::new(
            "Anna Koval".to_string(),
            "anna@example.com".to_string(),
            created_by,
            None,
            None,
        )
    }

    #[test]
    fn test_manager_manages_any_bill() {
        let mut manager = member("M", "m@hotel.test", StaffRole::Manager);
        manager.id = 10;
        assert!(manager.can_manage_bill(&paid_bill(99)));
        assert!(manager.can_manage_bill(&open_bill(99)));
        assert!(manager.can_approve_refund());
    }

    #[test]
    fn test_receptionist_rules() {
        let mut rec = member("R", "r@hotel.test", StaffRole::Receptionist);
        rec.id = 5;

        // own bill in any state
        assert!(rec.can_manage_bill(&paid_bill(5)));
        // someone else's bill while unpaid
        assert!(rec.can_manage_bill(&open_bill(99)));
        // someone else's paid bill is off limits
        assert!(!rec.can_manage_bill(&paid_bill(99)));
        // no refund power
        assert!(!rec.can_approve_refund());
    }

    #[test]
    fn test_plain_staff_has_no_billing_powers() {
        let mut s = member("S", "s@hotel.test", StaffRole::Staff);
        s.id = 3;
        assert!(!s.can_manage_bill(&open_bill(3)));
        assert!(!s.can_approve_refund());
        assert!(!s.role.can_handle_billing());
    }

    #[test]
    fn test_inactive_account_loses_powers() {
        let mut manager = member("M", "m@hotel.test", StaffRole::Manager);
        manager.id = 10;
        let last_day = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        assert!(manager.deactivate(last_day));
        assert!(!manager.can_manage_bill(&open_bill(10)));
        assert!(!manager.can_approve_refund());
        // idempotence
        assert!(!manager.deactivate(last_day));
        assert!(manager.activate());
        assert!(manager.can_approve_refund());
    }

    #[test]
    fn test_deactivation_stamps_termination_date() {
        let mut rec = member("R", "r@hotel.test", StaffRole::Receptionist);
        assert_eq!(rec.termination_date, None);

        let last_day = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        assert!(rec.deactivate(last_day));
        assert_eq!(rec.termination_date, Some(last_day));
        assert!(!rec.is_active);

        // coming back clears the stamp
        assert!(rec.activate());
        assert_eq!(rec.termination_date, None);
        assert!(rec.is_active);
    }

    #[test]
    fn test_role_levels_ordered() {
        assert!(StaffRole::Manager.level() > StaffRole::Receptionist.level());
        assert!(StaffRole::Receptionist.level() > StaffRole::Staff.level());
    }

    #[test]
    fn test_role_roundtrip() {
        for role in [StaffRole::Staff, StaffRole::Receptionist, StaffRole::Manager] {
            assert_eq!(StaffRole::from_str(&role.to_string()), Some(role));
        }
        assert_eq!(StaffRole::from_str("owner"), None);
    }
}

//! Billing desk service
//!
//! Creates and settles bills. Every mutating operation is performed by an
//! acting staff member and gated through the role rules: plain staff have
//! no billing powers, receptionists manage bills that are their own or not
//! yet paid, managers manage everything and alone approve refunds.
//!
//! Payments and refunds lock the bill row, insert the payment, and write
//! the re-derived bill state in one transaction.

use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::{
    config::BillingConfig,
    models::{Bill, BillStatus, Booking, GuestVisit, Payment, PaymentMethod, Staff},
    traits::{BillRepository, BookingRepository, PaymentRepository, Repository, StaffRepository},
    AppError, AppResult,
};
use innkeep_db::repositories::{
    bill_repo::{PgBillRepository, PgPaymentRepository},
    guest_repo::PgVisitRepository,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Billing desk
pub struct BillingDesk<B, P, S, K>
where
    B: BillRepository,
    P: PaymentRepository,
    S: StaffRepository,
    K: BookingRepository,
{
    bill_repo: Arc<B>,
    payment_repo: Arc<P>,
    staff_repo: Arc<S>,
    booking_repo: Arc<K>,
    pool: Arc<PgPool>,
    billing: BillingConfig,
}

/// One line of input for bill creation
#[derive(Debug, Clone)]
pub struct NewBillItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl<B, P, S, K> BillingDesk<B, P, S, K>
where
    B: BillRepository,
    P: PaymentRepository,
    S: StaffRepository,
    K: BookingRepository,
{
    /// Create a new billing desk
    pub fn new(
        bill_repo: Arc<B>,
        payment_repo: Arc<P>,
        staff_repo: Arc<S>,
        booking_repo: Arc<K>,
        pool: Arc<PgPool>,
        billing: BillingConfig,
    ) -> Self {
        Self {
            bill_repo,
            payment_repo,
            staff_repo,
            booking_repo,
            pool,
            billing,
        }
    }

    /// Resolve an active staff member who may handle billing
    async fn billing_actor(&self, staff_id: i32) -> AppResult<Staff> {
        let staff = self
            .staff_repo
            .find_by_id(staff_id)
            .await?
            .ok_or(AppError::StaffNotFound(staff_id))?;

        if !staff.is_active || !staff.role.can_handle_billing() {
            warn!("Staff {} denied billing access", staff_id);
            return Err(AppError::Forbidden(format!(
                "Staff member {} may not handle billing",
                staff_id
            )));
        }

        Ok(staff)
    }

    /// Fetch a bill and verify the actor may modify it
    async fn managed_bill(&self, actor: &Staff, bill_id: i32) -> AppResult<Bill> {
        let bill = self
            .bill_repo
            .find_by_id(bill_id)
            .await?
            .ok_or(AppError::BillNotFound(bill_id))?;

        if !actor.can_manage_bill(&bill) {
            warn!("Staff {} denied access to bill {}", actor.id, bill_id);
            return Err(AppError::Forbidden(format!(
                "Staff member {} may not manage bill {}",
                actor.id, bill_id
            )));
        }

        Ok(bill)
    }

    /// Create a bill, optionally with initial lines. Totals are computed
    /// with the configured tax rate before the insert.
    #[instrument(skip(self, items))]
    pub async fn create_bill(
        &self,
        acting_staff_id: i32,
        guest_name: String,
        guest_contact: String,
        booking_id: Option<i32>,
        items: Vec<NewBillItem>,
        notes: Option<String>,
    ) -> AppResult<Bill> {
        let actor = self.billing_actor(acting_staff_id).await?;

        if guest_name.trim().is_empty() {
            return Err(AppError::MissingField("guest_name".to_string()));
        }

        if let Some(bid) = booking_id {
            self.booking_repo
                .find_by_id(bid)
                .await?
                .ok_or(AppError::BookingNotFound(bid))?;
        }

        let mut bill = Bill::new(guest_name, guest_contact, actor.id, booking_id, notes);
        for item in items {
            bill.add_item(item.description, item.quantity, item.unit_price);
        }
        bill.recalc_totals(self.billing.tax_percent, None);

        let created = self.bill_repo.create(&bill).await?;
        info!(
            "Created bill {} for {} (total {})",
            created.id, created.guest_name, created.total
        );
        Ok(created)
    }

    /// Create a bill for a booking, seeded with one lodging line priced
    /// per night over the booked interval. Extra lines are appended before
    /// the recalculation.
    #[instrument(skip(self, extra_items))]
    pub async fn create_bill_for_booking(
        &self,
        acting_staff_id: i32,
        booking_id: i32,
        extra_items: Vec<NewBillItem>,
        notes: Option<String>,
    ) -> AppResult<Bill> {
        let actor = self.billing_actor(acting_staff_id).await?;

        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or(AppError::BookingNotFound(booking_id))?;

        if let Some(existing) = self.bill_repo.find_by_booking(booking_id).await? {
            return Err(AppError::AlreadyExists(format!(
                "Bill {} for booking {}",
                existing.id, booking_id
            )));
        }

        let mut bill = seeded_bill(&booking, actor.id, notes);
        for item in extra_items {
            bill.add_item(item.description, item.quantity, item.unit_price);
        }
        bill.recalc_totals(self.billing.tax_percent, None);

        let created = self.bill_repo.create(&bill).await?;
        info!(
            "Created bill {} for booking {} ({} nights, total {})",
            created.id,
            booking_id,
            booking.nights(),
            created.total
        );
        Ok(created)
    }

    /// Fetch a bill or fail
    pub async fn get_bill(&self, id: i32) -> AppResult<Bill> {
        self.bill_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::BillNotFound(id))
    }

    /// List bills with filters
    pub async fn list_bills(
        &self,
        status: Option<&str>,
        created_by: Option<i32>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Bill>, i64)> {
        self.bill_repo
            .list_filtered(status, created_by, from, to, limit, offset)
            .await
    }

    /// Append a line item and recompute totals
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        acting_staff_id: i32,
        bill_id: i32,
        description: String,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> AppResult<Bill> {
        let actor = self.billing_actor(acting_staff_id).await?;
        let mut bill = self.managed_bill(&actor, bill_id).await?;

        if description.trim().is_empty() {
            return Err(AppError::MissingField("description".to_string()));
        }
        if quantity <= Decimal::ZERO {
            return Err(AppError::InvalidInput("quantity must be positive".to_string()));
        }

        bill.add_item(description, quantity, unit_price);
        bill.recalc_totals(self.billing.tax_percent, None);

        self.bill_repo.update(&bill).await
    }

    /// Remove a line item by position and recompute totals
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        acting_staff_id: i32,
        bill_id: i32,
        index: usize,
    ) -> AppResult<Bill> {
        let actor = self.billing_actor(acting_staff_id).await?;
        let mut bill = self.managed_bill(&actor, bill_id).await?;

        if !bill.remove_item(index) {
            return Err(AppError::InvalidInput(format!(
                "Bill {} has no item at position {}",
                bill_id, index
            )));
        }
        bill.recalc_totals(self.billing.tax_percent, None);

        self.bill_repo.update(&bill).await
    }

    /// Recompute a bill's totals, optionally overriding the tax rate or
    /// changing the flat discount. Omitted values fall back to the
    /// configured tax and the bill's current discount.
    #[instrument(skip(self))]
    pub async fn recalc_bill(
        &self,
        acting_staff_id: i32,
        bill_id: i32,
        tax_percent: Option<Decimal>,
        discount: Option<Decimal>,
    ) -> AppResult<Bill> {
        let actor = self.billing_actor(acting_staff_id).await?;
        let mut bill = self.managed_bill(&actor, bill_id).await?;

        if let Some(t) = tax_percent {
            if t < Decimal::ZERO {
                return Err(AppError::InvalidInput("tax cannot be negative".to_string()));
            }
        }
        if let Some(d) = discount {
            if d < Decimal::ZERO {
                return Err(AppError::InvalidInput("discount cannot be negative".to_string()));
            }
        }

        bill.recalc_totals(tax_percent.unwrap_or(self.billing.tax_percent), discount);
        self.bill_repo.update(&bill).await
    }

    /// Record a payment against a bill.
    ///
    /// The bill row is locked, the payment inserted, and the bill's paid
    /// amount and derived status written back atomically.
    #[instrument(skip(self))]
    pub async fn record_payment(
        &self,
        acting_staff_id: i32,
        bill_id: i32,
        amount: Decimal,
        method: PaymentMethod,
        reference: Option<String>,
        notes: Option<String>,
    ) -> AppResult<(Bill, Payment)> {
        let actor = self.billing_actor(acting_staff_id).await?;

        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "payment amount must be positive".to_string(),
            ));
        }
        if method == PaymentMethod::Refund {
            return Err(AppError::InvalidInput(
                "refunds go through refund approval".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let mut bill = PgBillRepository::find_for_update(&mut tx, bill_id)
            .await?
            .ok_or(AppError::BillNotFound(bill_id))?;

        if !actor.can_manage_bill(&bill) {
            return Err(AppError::Forbidden(format!(
                "Staff member {} may not manage bill {}",
                actor.id, bill_id
            )));
        }

        if bill.status == BillStatus::Cancelled {
            return Err(AppError::StateConflict(format!(
                "Bill {} is cancelled",
                bill_id
            )));
        }

        let payment = Payment::new(bill_id, amount, method, actor.id, reference, notes);
        let created_payment = PgPaymentRepository::create_in_tx(&mut tx, &payment).await?;

        bill.apply_payment(amount);
        let updated_bill = PgBillRepository::update_in_tx(&mut tx, &bill).await?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit payment transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            "Recorded {} payment of {} against bill {} (paid {}, status {})",
            created_payment.method,
            created_payment.amount,
            bill_id,
            updated_bill.paid_amount,
            updated_bill.status
        );

        Ok((updated_bill, created_payment))
    }

    /// Approve a refund. Managers only; the amount must be positive and not
    /// exceed what has actually been paid. Stored as a negative payment.
    #[instrument(skip(self))]
    pub async fn approve_refund(
        &self,
        acting_staff_id: i32,
        bill_id: i32,
        amount: Decimal,
        notes: Option<String>,
    ) -> AppResult<(Bill, Payment)> {
        let actor = self
            .staff_repo
            .find_by_id(acting_staff_id)
            .await?
            .ok_or(AppError::StaffNotFound(acting_staff_id))?;

        if !actor.can_approve_refund() {
            warn!("Staff {} denied refund approval", acting_staff_id);
            return Err(AppError::Forbidden(format!(
                "Staff member {} may not approve refunds",
                acting_staff_id
            )));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let mut bill = PgBillRepository::find_for_update(&mut tx, bill_id)
            .await?
            .ok_or(AppError::BillNotFound(bill_id))?;

        bill.check_refund(amount)?;

        let payment = Payment::new(
            bill_id,
            -amount,
            PaymentMethod::Refund,
            actor.id,
            None,
            notes,
        );
        let created_payment = PgPaymentRepository::create_in_tx(&mut tx, &payment).await?;

        bill.apply_payment(-amount);
        let updated_bill = PgBillRepository::update_in_tx(&mut tx, &bill).await?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit refund transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            "Approved refund of {} on bill {} (paid now {})",
            amount, bill_id, updated_bill.paid_amount
        );

        Ok((updated_bill, created_payment))
    }

    /// Cancel a bill. Paid and refunded bills cannot be cancelled.
    #[instrument(skip(self))]
    pub async fn cancel_bill(&self, acting_staff_id: i32, bill_id: i32) -> AppResult<Bill> {
        let actor = self.billing_actor(acting_staff_id).await?;
        let mut bill = self.managed_bill(&actor, bill_id).await?;

        if !bill.cancel() {
            return Err(AppError::StateConflict(format!(
                "Bill {} cannot be cancelled from status {}",
                bill_id, bill.status
            )));
        }

        let updated = self.bill_repo.update(&bill).await?;
        info!("Cancelled bill {}", bill_id);
        Ok(updated)
    }

    /// Payment history for a bill
    pub async fn bill_payments(&self, bill_id: i32) -> AppResult<Vec<Payment>> {
        self.get_bill(bill_id).await?;
        self.payment_repo.find_by_bill(bill_id).await
    }

    /// Check a guest in and open their bill in one transaction.
    ///
    /// The receptionist shortcut for arrivals: the visit is created, the
    /// booking moves to checked-in, and a lodging-seeded bill is opened,
    /// all atomically. Fails like a plain check-in would (wrong state, early
    /// arrival, duplicate visit) and like bill creation would (existing
    /// bill for the booking).
    #[instrument(skip(self))]
    pub async fn check_in_with_bill(
        &self,
        acting_staff_id: i32,
        booking_id: i32,
        guest_id: i32,
        today: NaiveDate,
    ) -> AppResult<(Booking, GuestVisit, Bill)> {
        let actor = self.billing_actor(acting_staff_id).await?;

        let mut booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or(AppError::BookingNotFound(booking_id))?;

        if !booking.can_check_in(today) {
            return Err(AppError::StateConflict(format!(
                "Booking {} cannot be checked in (status {}, arrival {})",
                booking_id, booking.status, booking.check_in
            )));
        }

        if let Some(existing) = self.bill_repo.find_by_booking(booking_id).await? {
            return Err(AppError::AlreadyExists(format!(
                "Bill {} for booking {}",
                existing.id, booking_id
            )));
        }

        let guest_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM guests WHERE id = $1)")
                .bind(guest_id)
                .fetch_one(&*self.pool)
                .await
                .map_err(|e| {
                    error!("Database error looking up guest {}: {}", guest_id, e);
                    AppError::Database(format!("Failed to look up guest: {}", e))
                })?;
        if !guest_exists {
            return Err(AppError::GuestNotFound(guest_id));
        }

        let visit_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM guest_visits WHERE booking_id = $1)")
                .bind(booking_id)
                .fetch_one(&*self.pool)
                .await
                .map_err(|e| {
                    error!("Database error looking up visit: {}", e);
                    AppError::Database(format!("Failed to look up visit: {}", e))
                })?;
        if visit_exists {
            return Err(AppError::AlreadyExists(format!(
                "Visit for booking {}",
                booking_id
            )));
        }

        booking.guest_id = Some(guest_id);
        booking.check_in_guest();

        let visit = GuestVisit::open(
            guest_id,
            booking.id,
            Some(booking.room_id),
            booking.total_price,
        );

        let mut bill = seeded_bill(&booking, actor.id, None);
        bill.recalc_totals(self.billing.tax_percent, None);

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let created_visit = PgVisitRepository::create_in_tx(&mut tx, &visit).await?;

        sqlx::query(
            r#"
            UPDATE bookings
            SET status = $2, guest_id = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(booking.status.to_string())
        .bind(booking.guest_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to update booking {}: {}", booking.id, e);
            AppError::Database(format!("Failed to update booking: {}", e))
        })?;

        let created_bill = PgBillRepository::create_in_tx(&mut tx, &bill).await?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit check-in transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            "Checked in guest {} for booking {} with bill {} (total {})",
            guest_id, booking_id, created_bill.id, created_bill.total
        );

        Ok((booking, created_visit, created_bill))
    }
}

/// Empty bill for a booking with the lodging line already on it
fn seeded_bill(booking: &Booking, created_by: i32, notes: Option<String>) -> Bill {
    let nights = booking.nights();
    let nightly = booking.total_price / Decimal::from(nights);

    let mut bill = Bill::new(
        booking.guest_name.clone(),
        booking.guest_phone.clone(),
        created_by,
        Some(booking.id),
        notes,
    );
    bill.add_item(
        format!("Lodging (room {})", booking.room_id),
        Decimal::from(nights),
        nightly,
    );
    bill
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_seeded_bill_lodging_line() {
        let booking = Booking::new(
            7,
            "Anna Koval".to_string(),
            "+7-900-000-00-00".to_string(),
            None,
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 9, 4).unwrap(),
            dec!(3000),
        );

        let mut bill = seeded_bill(&booking, 1, None);
        assert_eq!(bill.items.len(), 1);
        assert_eq!(bill.items[0].quantity, dec!(3));
        assert_eq!(bill.items[0].unit_price, dec!(3000));
        assert_eq!(bill.booking_id, Some(booking.id));

        bill.recalc_totals(dec!(10), None);
        assert_eq!(bill.subtotal, dec!(9000));
        assert_eq!(bill.total, dec!(9900));
    }
}

//! Front desk service
//!
//! Runs the physical arrival and departure flow:
//! - Guest registry CRUD and search
//! - Check-in: booking transition plus visit creation, atomically
//! - Check-out: totals recomputation, visit closure, booking transition
//!
//! A visit exists exactly once per booking. The check-in date rule is
//! strict: a confirmed booking cannot be checked in before its planned
//! arrival date.

use chrono::{NaiveDate, Utc};
use innkeep_core::{
    models::{Booking, Guest, GuestVisit},
    traits::{BookingRepository, GuestRepository, Repository, VisitRepository},
    AppError, AppResult,
};
use innkeep_db::repositories::{
    guest_repo::PgVisitRepository, service_repo::PgServiceOrderRepository,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Front desk
pub struct FrontDesk<G: GuestRepository, V: VisitRepository, B: BookingRepository> {
    guest_repo: Arc<G>,
    visit_repo: Arc<V>,
    booking_repo: Arc<B>,
    pool: Arc<PgPool>,
}

impl<G: GuestRepository, V: VisitRepository, B: BookingRepository> FrontDesk<G, V, B> {
    /// Create a new front desk
    pub fn new(
        guest_repo: Arc<G>,
        visit_repo: Arc<V>,
        booking_repo: Arc<B>,
        pool: Arc<PgPool>,
    ) -> Self {
        Self {
            guest_repo,
            visit_repo,
            booking_repo,
            pool,
        }
    }

    /// Register a guest
    #[instrument(skip(self))]
    pub async fn register_guest(
        &self,
        first_name: String,
        last_name: String,
        phone: Option<String>,
        email: Option<String>,
        doc_number: Option<String>,
    ) -> AppResult<Guest> {
        if first_name.trim().is_empty() {
            return Err(AppError::MissingField("first_name".to_string()));
        }
        if last_name.trim().is_empty() {
            return Err(AppError::MissingField("last_name".to_string()));
        }

        let guest = Guest::new(first_name, last_name, phone, email, doc_number);
        let created = self.guest_repo.create(&guest).await?;
        info!("Registered guest {} ({})", created.full_name(), created.id);
        Ok(created)
    }

    /// Fetch a guest or fail
    pub async fn get_guest(&self, id: i32) -> AppResult<Guest> {
        self.guest_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::GuestNotFound(id))
    }

    /// Search guests by name, contact, or document
    pub async fn search_guests(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Guest>, i64)> {
        self.guest_repo.search(query, limit, offset).await
    }

    /// Update guest details
    #[instrument(skip(self))]
    pub async fn update_guest(
        &self,
        id: i32,
        first_name: Option<String>,
        last_name: Option<String>,
        phone: Option<String>,
        email: Option<String>,
        doc_number: Option<String>,
    ) -> AppResult<Guest> {
        let mut guest = self.get_guest(id).await?;

        if let Some(v) = first_name {
            guest.first_name = v;
        }
        if let Some(v) = last_name {
            guest.last_name = v;
        }
        if let Some(v) = phone {
            guest.phone = Some(v);
        }
        if let Some(v) = email {
            guest.email = Some(v);
        }
        if let Some(v) = doc_number {
            guest.doc_number = Some(v);
        }

        self.guest_repo.update(&guest).await
    }

    /// Delete a guest. Their visit history goes with them.
    #[instrument(skip(self))]
    pub async fn remove_guest(&self, id: i32) -> AppResult<()> {
        if !self.guest_repo.delete(id).await? {
            return Err(AppError::GuestNotFound(id));
        }
        info!("Removed guest {}", id);
        Ok(())
    }

    /// Check a guest in against a confirmed booking.
    ///
    /// The booking transition and the visit insert commit in one
    /// transaction. The visit snapshots the booking's total price as its
    /// lodging amount.
    #[instrument(skip(self))]
    pub async fn check_in(
        &self,
        booking_id: i32,
        guest_id: i32,
        today: NaiveDate,
    ) -> AppResult<(Booking, GuestVisit)> {
        let mut booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or(AppError::BookingNotFound(booking_id))?;

        let guest = self.get_guest(guest_id).await?;

        if !booking.can_check_in(today) {
            return Err(AppError::StateConflict(format!(
                "Booking {} cannot be checked in (status {}, arrival {})",
                booking_id, booking.status, booking.check_in
            )));
        }

        if self.visit_repo.find_by_booking(booking_id).await?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "Visit for booking {}",
                booking_id
            )));
        }

        booking.guest_id = Some(guest.id);
        booking.check_in_guest();

        let visit = GuestVisit::open(
            guest.id,
            booking.id,
            Some(booking.room_id),
            booking.total_price,
        );

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

        tx.commit().await.map_err(|e| {
            error!("Failed to commit check-in transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            "Checked in guest {} for booking {} (visit {})",
            guest.id, booking.id, created_visit.id
        );

        Ok((booking, created_visit))
    }

    /// Check a guest out.
    ///
    /// Recomputes the visit's service totals from its orders, closes the
    /// visit, and moves the booking to checked-out, all in one transaction.
    #[instrument(skip(self))]
    pub async fn check_out(&self, booking_id: i32) -> AppResult<(Booking, GuestVisit)> {
        let mut booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or(AppError::BookingNotFound(booking_id))?;

        if !booking.can_check_out() {
            return Err(AppError::StateConflict(format!(
                "Booking {} cannot be checked out from status {}",
                booking_id, booking.status
            )));
        }

        let mut visit = self
            .visit_repo
            .find_by_booking(booking_id)
            .await?
            .ok_or_else(|| {
                AppError::StateConflict(format!("Booking {} has no open visit", booking_id))
            })?;

        if !visit.is_open() {
            return Err(AppError::StateConflict(format!(
                "Visit {} is already closed",
                visit.id
            )));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let orders = PgServiceOrderRepository::find_by_visit_in_tx(&mut tx, visit.id).await?;
        visit.recalc_totals(&orders);
        visit.close(Utc::now());

        let updated_visit = PgVisitRepository::update_in_tx(&mut tx, &visit).await?;

        booking.check_out_guest();

        sqlx::query(
            r#"
            UPDATE bookings
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(booking.status.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to update booking {}: {}", booking.id, e);
            AppError::Database(format!("Failed to update booking: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit check-out transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            "Checked out booking {} (visit {}, total {})",
            booking.id, updated_visit.id, updated_visit.total_amount
        );

        Ok((booking, updated_visit))
    }

    /// Fetch a visit or fail
    pub async fn get_visit(&self, id: i32) -> AppResult<GuestVisit> {
        self.visit_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::VisitNotFound(id))
    }

    /// All visits of a guest, newest first
    pub async fn guest_visits(&self, guest_id: i32) -> AppResult<Vec<GuestVisit>> {
        // 404 for unknown guests rather than an empty list
        self.get_guest(guest_id).await?;
        self.visit_repo.find_by_guest(guest_id).await
    }

    /// Visits currently open (guests in house)
    pub async fn open_visits(&self) -> AppResult<Vec<GuestVisit>> {
        self.visit_repo.find_open().await
    }
}

//! Booking desk service
//!
//! Owns the room inventory and the reservation lifecycle up to check-in:
//! - Room CRUD and availability search
//! - Booking creation with the double-booking guard
//! - Confirmation and cancellation
//!
//! Booking creation locks the room row and re-checks overlap inside one
//! transaction, so two concurrent requests for the same room and dates
//! cannot both succeed.

use chrono::NaiveDate;
use innkeep_core::{
    models::{Booking, BookingStatus, Room, RoomType},
    traits::{BookingRepository, Repository, RoomRepository},
    AppError, AppResult,
};
use innkeep_db::repositories::{booking_repo::PgBookingRepository, room_repo::PgRoomRepository};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Booking desk
pub struct BookingDesk<R: RoomRepository, B: BookingRepository> {
    room_repo: Arc<R>,
    booking_repo: Arc<B>,
    pool: Arc<PgPool>,
}

/// Input for creating a booking
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub room_id: i32,
    pub guest_name: String,
    pub guest_phone: String,
    pub guest_email: Option<String>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub special_requests: Option<String>,
}

impl<R: RoomRepository, B: BookingRepository> BookingDesk<R, B> {
    /// Create a new booking desk
    pub fn new(room_repo: Arc<R>, booking_repo: Arc<B>, pool: Arc<PgPool>) -> Self {
        Self {
            room_repo,
            booking_repo,
            pool,
        }
    }

    /// Register a new room. The nightly price comes from the room type.
    #[instrument(skip(self))]
    pub async fn add_room(
        &self,
        number: String,
        room_type: RoomType,
        floor: i32,
        capacity: i32,
        description: Option<String>,
    ) -> AppResult<Room> {
        if number.trim().is_empty() {
            return Err(AppError::MissingField("number".to_string()));
        }
        if capacity < 1 {
            return Err(AppError::InvalidInput("capacity must be at least 1".to_string()));
        }

        let room = Room::new(number, room_type, floor, capacity, description);
        let created = self.room_repo.create(&room).await?;
        info!("Registered room {} ({})", created.number, created.room_type);
        Ok(created)
    }

    /// Fetch a room or fail
    pub async fn get_room(&self, id: i32) -> AppResult<Room> {
        self.room_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::RoomNotFound(id))
    }

    /// List rooms with filters
    pub async fn list_rooms(
        &self,
        room_type: Option<&str>,
        floor: Option<i32>,
        min_capacity: Option<i32>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Room>, i64)> {
        self.room_repo
            .list_filtered(room_type, floor, min_capacity, limit, offset)
            .await
    }

    /// Update mutable room attributes. A type change re-derives the price.
    #[instrument(skip(self))]
    pub async fn update_room(
        &self,
        id: i32,
        room_type: Option<RoomType>,
        floor: Option<i32>,
        capacity: Option<i32>,
        description: Option<String>,
        is_available: Option<bool>,
    ) -> AppResult<Room> {
        let mut room = self.get_room(id).await?;

        if let Some(ty) = room_type {
            room.set_type(ty);
        }
        if let Some(f) = floor {
            room.floor = f;
        }
        if let Some(c) = capacity {
            if c < 1 {
                return Err(AppError::InvalidInput("capacity must be at least 1".to_string()));
            }
            room.capacity = c;
        }
        if let Some(d) = description {
            room.description = Some(d);
        }
        if let Some(a) = is_available {
            room.is_available = a;
        }

        self.room_repo.update(&room).await
    }

    /// Remove a room. Its bookings go with it.
    #[instrument(skip(self))]
    pub async fn remove_room(&self, id: i32) -> AppResult<()> {
        if !self.room_repo.delete(id).await? {
            return Err(AppError::RoomNotFound(id));
        }
        info!("Removed room {}", id);
        Ok(())
    }

    /// Rooms free for the whole date range
    #[instrument(skip(self))]
    pub async fn search_available_rooms(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        room_type: Option<&str>,
        min_capacity: Option<i32>,
    ) -> AppResult<Vec<Room>> {
        validate_date_range(check_in, check_out)?;
        self.room_repo
            .find_available(check_in, check_out, room_type, min_capacity)
            .await
    }

    /// Create a pending booking.
    ///
    /// The whole operation runs in one transaction: the room row is locked,
    /// overlap is re-checked under the lock, and only then is the booking
    /// inserted. The price is captured from the room's current nightly rate.
    #[instrument(skip(self, input))]
    pub async fn create_booking(&self, input: NewBooking) -> AppResult<Booking> {
        validate_date_range(input.check_in, input.check_out)?;
        if input.guest_name.trim().is_empty() {
            return Err(AppError::MissingField("guest_name".to_string()));
        }
        if input.guest_phone.trim().is_empty() {
            return Err(AppError::MissingField("guest_phone".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let room = PgRoomRepository::lock_for_update(&mut tx, input.room_id)
            .await?
            .ok_or(AppError::RoomNotFound(input.room_id))?;

        if !room.is_available {
            return Err(AppError::RoomUnavailable {
                room: room.number,
                check_in: input.check_in,
                check_out: input.check_out,
            });
        }

        let overlaps = PgBookingRepository::has_active_overlap_in_tx(
            &mut tx,
            input.room_id,
            input.check_in,
            input.check_out,
            None,
        )
        .await?;

        if overlaps {
            warn!(
                "Room {} already booked between {} and {}",
                room.number, input.check_in, input.check_out
            );
            return Err(AppError::RoomUnavailable {
                room: room.number,
                check_in: input.check_in,
                check_out: input.check_out,
            });
        }

        let mut booking = Booking::new(
            input.room_id,
            input.guest_name,
            input.guest_phone,
            input.guest_email,
            input.check_in,
            input.check_out,
            room.price_per_night,
        );
        booking.special_requests = input.special_requests;

        let created = PgBookingRepository::create_in_tx(&mut tx, &booking).await?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit booking transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            "Created booking {} for room {} ({} to {}, total {})",
            created.id, created.room_id, created.check_in, created.check_out, created.total_price
        );

        Ok(created)
    }

    /// Fetch a booking or fail
    pub async fn get_booking(&self, id: i32) -> AppResult<Booking> {
        self.booking_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::BookingNotFound(id))
    }

    /// List bookings with filters
    pub async fn list_bookings(
        &self,
        room_id: Option<i32>,
        status: Option<BookingStatus>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Booking>, i64)> {
        self.booking_repo
            .list_filtered(room_id, status, from, to, limit, offset)
            .await
    }

    /// Confirmed bookings arriving on a date
    pub async fn arrivals(&self, date: NaiveDate) -> AppResult<Vec<Booking>> {
        self.booking_repo.find_arrivals(date).await
    }

    /// Confirm a pending booking.
    ///
    /// Confirmation is where a booking starts blocking its room, so the
    /// whole step runs like creation does: the room row is locked, overlap
    /// is re-checked under the lock, and the status flips in the same
    /// transaction. Two concurrent confirmations of overlapping pending
    /// bookings serialize on the room lock and the loser sees the winner.
    #[instrument(skip(self))]
    pub async fn confirm_booking(&self, id: i32) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let booking = PgBookingRepository::find_in_tx(&mut tx, id)
            .await?
            .ok_or(AppError::BookingNotFound(id))?;

        PgRoomRepository::lock_for_update(&mut tx, booking.room_id)
            .await?
            .ok_or(AppError::RoomNotFound(booking.room_id))?;

        // re-read under the lock; another confirmation of an overlapping
        // booking may have committed while we waited on it
        let mut booking = PgBookingRepository::find_in_tx(&mut tx, id)
            .await?
            .ok_or(AppError::BookingNotFound(id))?;

        let overlaps = PgBookingRepository::has_active_overlap_in_tx(
            &mut tx,
            booking.room_id,
            booking.check_in,
            booking.check_out,
            Some(id),
        )
        .await?;
        if overlaps {
            warn!(
                "Booking {} conflicts with an active booking for room {}",
                id, booking.room_id
            );
            return Err(AppError::StateConflict(format!(
                "Booking {} conflicts with another active booking for room {}",
                id, booking.room_id
            )));
        }

        if !booking.confirm() {
            return Err(AppError::StateConflict(format!(
                "Booking {} cannot be confirmed from status {}",
                id, booking.status
            )));
        }

        let updated = PgBookingRepository::update_in_tx(&mut tx, &booking).await?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit confirmation transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!("Confirmed booking {}", id);
        Ok(updated)
    }

    /// Cancel a booking from any non-terminal state
    #[instrument(skip(self))]
    pub async fn cancel_booking(&self, id: i32) -> AppResult<Booking> {
        let mut booking = self.get_booking(id).await?;

        if !booking.cancel() {
            return Err(AppError::StateConflict(format!(
                "Booking {} cannot be cancelled from status {}",
                id, booking.status
            )));
        }

        let updated = self.booking_repo.update(&booking).await?;
        info!("Cancelled booking {}", id);
        Ok(updated)
    }

    /// Link a registered guest identity to a booking
    #[instrument(skip(self))]
    pub async fn attach_guest(&self, booking_id: i32, guest_id: i32) -> AppResult<Booking> {
        let mut booking = self.get_booking(booking_id).await?;
        booking.guest_id = Some(guest_id);
        self.booking_repo.update(&booking).await
    }
}

/// Reject inverted or empty date ranges before they reach the overlap query
fn validate_date_range(check_in: NaiveDate, check_out: NaiveDate) -> AppResult<()> {
    if check_out <= check_in {
        return Err(AppError::InvalidInput(
            "check_out must be after check_in".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validate_date_range() {
        let today = chrono::Utc::now().date_naive();
        assert!(validate_date_range(today, today + Duration::days(1)).is_ok());
        assert!(validate_date_range(today, today).is_err());
        assert!(validate_date_range(today, today - Duration::days(1)).is_err());
    }

    async fn desk_over_fresh_pool() -> (BookingDesk<PgRoomRepository, PgBookingRepository>, Arc<PgPool>)
    {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/innkeep".to_string());
        let pool = innkeep_db::create_pool(&database_url, Some(5)).await.unwrap();
        innkeep_db::pool::run_migrations(&pool).await.unwrap();
        let pool = Arc::new(pool);
        let desk = BookingDesk::new(
            Arc::new(PgRoomRepository::new((*pool).clone())),
            Arc::new(PgBookingRepository::new((*pool).clone())),
            pool.clone(),
        );
        (desk, pool)
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_concurrent_confirmations_of_overlapping_pendings() {
        let (desk, _pool) = desk_over_fresh_pool().await;

        let number = format!(
            "T{}",
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        let room = desk
            .add_room(number, RoomType::Standard, 1, 2, None)
            .await
            .unwrap();

        let today = chrono::Utc::now().date_naive();
        let booking_for = |name: &str| NewBooking {
            room_id: room.id,
            guest_name: name.to_string(),
            guest_phone: "+7-900-000-00-01".to_string(),
            guest_email: None,
            check_in: today + Duration::days(400),
            check_out: today + Duration::days(403),
            special_requests: None,
        };

        // two pending bookings on the same dates are legal; only a
        // confirmed booking blocks the room
        let a = desk.create_booking(booking_for("Anna")).await.unwrap();
        let b = desk.create_booking(booking_for("Boris")).await.unwrap();

        let (ra, rb) = tokio::join!(desk.confirm_booking(a.id), desk.confirm_booking(b.id));
        assert!(
            ra.is_ok() != rb.is_ok(),
            "exactly one confirmation may win: {:?} / {:?}",
            ra,
            rb
        );
        let loser = if ra.is_ok() { rb } else { ra };
        assert!(matches!(loser, Err(AppError::StateConflict(_))));
    }
}

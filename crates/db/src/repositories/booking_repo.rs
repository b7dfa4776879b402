//! Repository for the `bookings` table.
//!
//! Slot conflicts are resolved in [`BookingRepo::create`]: the room row is
//! locked `FOR UPDATE` for the duration of the transaction, so two requests
//! for the same room serialize and the second one sees the first one's
//! booking when it re-checks for overlaps.

use sqlx::PgPool;
use studiora_core::booking::BookingStatus;
use studiora_core::types::{DbId, Timestamp};

use crate::models::booking::{Booking, BookingDetail, BusySlot, NewBooking};

const COLUMNS: &str = "id, room_id, client_id, starts_at, ends_at, status, total_price, comment, \
                        cancelled_by, cancel_reason, confirmed_at, cancelled_at, completed_at, \
                        payment_id, created_at, updated_at";

const DETAIL_SELECT: &str = "SELECT b.id, b.room_id, b.client_id, b.starts_at, b.ends_at, \
        b.status, b.total_price, b.comment, b.cancel_reason, b.payment_id, b.created_at, \
        r.name AS room_name, s.id AS studio_id, s.name AS studio_name, s.owner_id \
    FROM bookings b \
    JOIN rooms r ON r.id = b.room_id \
    JOIN studios s ON s.id = r.studio_id";

/// Predicate selecting bookings that occupy their slot: confirmed ones and
/// pending ones still inside their payment window (`$timeout` minutes).
fn blocking_predicate(timeout_param: usize) -> String {
    format!(
        "(status = 'confirmed' \
          OR (status = 'pending' AND created_at > NOW() - make_interval(mins => ${timeout_param})))"
    )
}

/// Result of an attempted booking insert.
#[derive(Debug)]
pub enum CreateBookingOutcome {
    Created(Booking),
    /// The room does not exist, is inactive, or its studio is deleted.
    RoomUnavailable,
    /// Another booking already holds an overlapping slot.
    Conflict,
}

/// Provides booking persistence and lifecycle transitions.
pub struct BookingRepo;

impl BookingRepo {
    /// Insert a pending booking if its slot is free.
    pub async fn create(
        pool: &PgPool,
        input: &NewBooking,
        payment_timeout_mins: i32,
    ) -> Result<CreateBookingOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Serializes concurrent bookings of the same room.
        let room: Option<(DbId,)> = sqlx::query_as(
            "SELECT r.id FROM rooms r
             JOIN studios s ON s.id = r.studio_id
             WHERE r.id = $1 AND r.is_active AND s.deleted_at IS NULL
             FOR UPDATE OF r",
        )
        .bind(input.room_id)
        .fetch_optional(&mut *tx)
        .await?;

        if room.is_none() {
            return Ok(CreateBookingOutcome::RoomUnavailable);
        }

        let overlap_query = format!(
            "SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE room_id = $1
                  AND starts_at < $3
                  AND ends_at > $2
                  AND {}
             )",
            blocking_predicate(4)
        );
        let taken: bool = sqlx::query_scalar(&overlap_query)
            .bind(input.room_id)
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(payment_timeout_mins)
            .fetch_one(&mut *tx)
            .await?;

        if taken {
            return Ok(CreateBookingOutcome::Conflict);
        }

        let query = format!(
            "INSERT INTO bookings (room_id, client_id, starts_at, ends_at, total_price, comment)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(input.room_id)
            .bind(input.client_id)
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(input.total_price)
            .bind(&input.comment)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(CreateBookingOutcome::Created(booking))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bookings WHERE id = $1");
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Booking with room, studio and owner, for permission checks.
    pub async fn find_detail(pool: &PgPool, id: DbId) -> Result<Option<BookingDetail>, sqlx::Error> {
        let query = format!("{DETAIL_SELECT} WHERE b.id = $1");
        sqlx::query_as::<_, BookingDetail>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Bookings made by a client, newest slot first.
    pub async fn list_for_client(
        pool: &PgPool,
        client_id: DbId,
        status: Option<BookingStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookingDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT}
             WHERE b.client_id = $1 AND ($2::text IS NULL OR b.status = $2)
             ORDER BY b.starts_at DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, BookingDetail>(&query)
            .bind(client_id)
            .bind(status.map(BookingStatus::as_str))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Bookings across all studios of an owner, soonest slot first.
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: DbId,
        status: Option<BookingStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookingDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT}
             WHERE s.owner_id = $1 AND ($2::text IS NULL OR b.status = $2)
             ORDER BY b.starts_at ASC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, BookingDetail>(&query)
            .bind(owner_id)
            .bind(status.map(BookingStatus::as_str))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Occupied intervals of a room intersecting `[from, to)`.
    pub async fn busy_slots(
        pool: &PgPool,
        room_id: DbId,
        from: Timestamp,
        to: Timestamp,
        payment_timeout_mins: i32,
    ) -> Result<Vec<BusySlot>, sqlx::Error> {
        let query = format!(
            "SELECT starts_at, ends_at FROM bookings
             WHERE room_id = $1 AND starts_at < $3 AND ends_at > $2 AND {}
             ORDER BY starts_at",
            blocking_predicate(4)
        );
        sqlx::query_as::<_, BusySlot>(&query)
            .bind(room_id)
            .bind(from)
            .bind(to)
            .bind(payment_timeout_mins)
            .fetch_all(pool)
            .await
    }

    /// Move a booking from `from` to `to`.
    ///
    /// The `status = from` guard makes the transition a compare-and-set:
    /// returns `None` when the booking was not in `from` (already moved by a
    /// concurrent request, the lifecycle job, or a webhook).
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let stamp = match to {
            BookingStatus::Confirmed => ", confirmed_at = NOW()",
            BookingStatus::Completed => ", completed_at = NOW()",
            BookingStatus::Cancelled => ", cancelled_at = NOW()",
            BookingStatus::Pending => "",
        };
        let query = format!(
            "UPDATE bookings SET status = $3{stamp}
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Confirm a pending booking on behalf of `payment_id`.
    ///
    /// `None` when the booking already left `pending`; the caller then
    /// decides whether this payment is a duplicate.
    pub async fn confirm_paid(
        pool: &PgPool,
        id: DbId,
        payment_id: DbId,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!(
            "UPDATE bookings SET status = 'confirmed', confirmed_at = NOW(), payment_id = $2
             WHERE id = $1 AND status = 'pending'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(payment_id)
            .fetch_optional(pool)
            .await
    }

    /// Cancel a booking currently in `from`, recording who cancelled and why.
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        from: BookingStatus,
        cancelled_by: Option<DbId>,
        reason: Option<&str>,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!(
            "UPDATE bookings SET
                status = 'cancelled',
                cancelled_at = NOW(),
                cancelled_by = $3,
                cancel_reason = $4
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(cancelled_by)
            .bind(reason)
            .fetch_optional(pool)
            .await
    }

    /// Cancel pending bookings whose payment window elapsed.
    pub async fn expire_stale_pending(
        pool: &PgPool,
        payment_timeout_mins: i32,
    ) -> Result<Vec<Booking>, sqlx::Error> {
        let query = format!(
            "UPDATE bookings SET
                status = 'cancelled',
                cancelled_at = NOW(),
                cancel_reason = 'Payment was not received in time'
             WHERE status = 'pending'
               AND created_at <= NOW() - make_interval(mins => $1)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(payment_timeout_mins)
            .fetch_all(pool)
            .await
    }

    /// Mark confirmed bookings whose slot has ended as completed.
    pub async fn complete_finished(pool: &PgPool) -> Result<Vec<Booking>, sqlx::Error> {
        let query = format!(
            "UPDATE bookings SET status = 'completed', completed_at = NOW()
             WHERE status = 'confirmed' AND ends_at <= NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query).fetch_all(pool).await
    }
}

//! Booking entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studiora_core::booking::BookingStatus;
use studiora_core::error::CoreError;
use studiora_core::types::{DbId, MinorUnits, Timestamp};
use validator::Validate;

/// A row from the `bookings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: DbId,
    pub room_id: DbId,
    pub client_id: DbId,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub status: String,
    pub total_price: MinorUnits,
    pub comment: Option<String>,
    pub cancelled_by: Option<DbId>,
    pub cancel_reason: Option<String>,
    pub confirmed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    /// Payment that confirmed the booking.
    pub payment_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Booking {
    /// Parsed status. The column is CHECK-constrained, so failure means
    /// schema drift.
    pub fn status(&self) -> Result<BookingStatus, CoreError> {
        self.status.parse()
    }
}

/// Booking joined with its room, studio and studio owner, as shown in
/// booking lists and used for permission checks.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookingDetail {
    pub id: DbId,
    pub room_id: DbId,
    pub client_id: DbId,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub status: String,
    pub total_price: MinorUnits,
    pub comment: Option<String>,
    pub cancel_reason: Option<String>,
    pub payment_id: Option<DbId>,
    pub created_at: Timestamp,
    pub room_name: String,
    pub studio_id: DbId,
    pub studio_name: String,
    pub owner_id: DbId,
}

impl BookingDetail {
    pub fn status(&self) -> Result<BookingStatus, CoreError> {
        self.status.parse()
    }
}

/// Booking request as submitted by a client.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBooking {
    pub room_id: DbId,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    #[validate(length(max = 1000, message = "must not exceed 1000 characters"))]
    pub comment: Option<String>,
}

/// Fully priced booking ready for insertion.
#[derive(Debug)]
pub struct NewBooking {
    pub room_id: DbId,
    pub client_id: DbId,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub total_price: MinorUnits,
    pub comment: Option<String>,
}

/// An occupied interval of a room, exposed by the availability endpoint
/// without revealing who booked it.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct BusySlot {
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
}

/// Optional reason supplied when cancelling.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelBooking {
    #[validate(length(max = 500, message = "must not exceed 500 characters"))]
    pub reason: Option<String>,
}

//! Payment entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use studiora_core::error::CoreError;
use studiora_core::payment::{PaymentPurpose, PaymentStatus};
use studiora_core::types::{DbId, MinorUnits, Timestamp};

/// A row from the `payments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: DbId,
    pub purpose: String,
    pub booking_id: Option<DbId>,
    pub promotion_id: Option<DbId>,
    pub payer_id: DbId,
    pub amount: MinorUnits,
    pub currency: String,
    pub status: String,
    pub gateway_payment_id: Option<String>,
    pub confirmation_url: Option<String>,
    pub paid_at: Option<Timestamp>,
    pub refunded_amount: MinorUnits,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    pub fn status(&self) -> Result<PaymentStatus, CoreError> {
        self.status.parse()
    }

    pub fn purpose(&self) -> Result<PaymentPurpose, CoreError> {
        self.purpose.parse()
    }
}

/// DTO for creating a local payment before contacting the gateway.
#[derive(Debug)]
pub struct CreatePayment {
    pub purpose: PaymentPurpose,
    pub booking_id: Option<DbId>,
    pub promotion_id: Option<DbId>,
    pub payer_id: DbId,
    pub amount: MinorUnits,
    pub currency: String,
}

/// A row from the `payment_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentEvent {
    pub id: DbId,
    pub payment_id: DbId,
    pub event: String,
    pub reported_status: String,
    pub applied: bool,
    pub created_at: Timestamp,
}

//! Promotion entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studiora_core::types::{DbId, MinorUnits, Timestamp};

/// A row from the `promotions` table.
///
/// A promotion only affects ranking once `is_paid` is set by a successful
/// payment.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Promotion {
    pub id: DbId,
    pub studio_id: DbId,
    pub plan_code: String,
    pub boost: i32,
    pub price: MinorUnits,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub is_paid: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Purchase request body.
#[derive(Debug, Deserialize)]
pub struct PurchasePromotion {
    pub plan_code: String,
}

/// DTO for inserting an unpaid promotion.
#[derive(Debug)]
pub struct CreatePromotion {
    pub studio_id: DbId,
    pub plan_code: String,
    pub boost: i32,
    pub price: MinorUnits,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
}

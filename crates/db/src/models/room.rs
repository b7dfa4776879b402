//! Room entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studiora_core::types::{DbId, MinorUnits, Timestamp};
use validator::Validate;

/// A row from the `rooms` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Room {
    pub id: DbId,
    pub studio_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub area_sqm: Option<i32>,
    pub capacity: i32,
    /// Price per hour in minor units.
    pub hourly_price: MinorUnits,
    pub image_urls: Vec<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a room inside a studio (studio id comes from the path).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoom {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub name: String,
    #[validate(length(max = 5000, message = "must not exceed 5000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 1, message = "must be positive"))]
    pub area_sqm: Option<i32>,
    #[validate(range(min = 1, max = 500, message = "must be 1-500"))]
    pub capacity: Option<i32>,
    #[validate(range(min = 1i64, max = 10_000_000_000i64, message = "must be between 0.01 and 100000000.00"))]
    pub hourly_price: MinorUnits,
    #[validate(length(max = 20, message = "at most 20 images"))]
    pub image_urls: Option<Vec<String>>,
}

/// DTO for updating a room. All fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoom {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 5000, message = "must not exceed 5000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 1, message = "must be positive"))]
    pub area_sqm: Option<i32>,
    #[validate(range(min = 1, max = 500, message = "must be 1-500"))]
    pub capacity: Option<i32>,
    #[validate(range(min = 1i64, max = 10_000_000_000i64, message = "must be between 0.01 and 100000000.00"))]
    pub hourly_price: Option<MinorUnits>,
    #[validate(length(max = 20, message = "at most 20 images"))]
    pub image_urls: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

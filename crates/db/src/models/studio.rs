//! Studio entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studiora_core::types::{DbId, MinorUnits, Timestamp};
use validator::Validate;

/// A row from the `studios` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Studio {
    pub id: DbId,
    pub owner_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub city: String,
    pub address: String,
    pub phone: Option<String>,
    pub image_urls: Vec<String>,
    pub rating_avg: Option<f64>,
    pub reviews_count: i32,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A catalog row: studio plus aggregates computed over its rooms and
/// active promotions.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudioCard {
    pub id: DbId,
    pub owner_id: DbId,
    pub name: String,
    pub city: String,
    pub address: String,
    pub image_urls: Vec<String>,
    pub rating_avg: Option<f64>,
    pub reviews_count: i32,
    /// Cheapest active room's hourly price.
    pub min_hourly_price: Option<MinorUnits>,
    pub max_capacity: Option<i32>,
    pub rooms_count: i64,
    /// Boost of the currently running promotion, 0 if none.
    pub promotion_boost: i32,
    pub created_at: Timestamp,
}

/// DTO for creating a studio. The owner comes from the authenticated user.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudio {
    #[validate(length(min = 2, max = 120, message = "must be 2-120 characters"))]
    pub name: String,
    #[validate(length(max = 5000, message = "must not exceed 5000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub city: String,
    #[validate(length(min = 1, max = 300, message = "must be 1-300 characters"))]
    pub address: String,
    #[validate(length(min = 5, max = 32, message = "must be 5-32 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 20, message = "at most 20 images"))]
    pub image_urls: Option<Vec<String>>,
}

/// DTO for updating a studio. All fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudio {
    #[validate(length(min = 2, max = 120, message = "must be 2-120 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 5000, message = "must not exceed 5000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 300, message = "must be 1-300 characters"))]
    pub address: Option<String>,
    #[validate(length(min = 5, max = 32, message = "must be 5-32 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 20, message = "at most 20 images"))]
    pub image_urls: Option<Vec<String>>,
}

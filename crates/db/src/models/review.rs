//! Review entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studiora_core::types::{DbId, Timestamp};

/// A row from the `reviews` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Review {
    pub id: DbId,
    pub booking_id: DbId,
    pub studio_id: DbId,
    pub author_id: DbId,
    pub rating: i16,
    pub text: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Review with the author's display name for public listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewWithAuthor {
    pub id: DbId,
    pub studio_id: DbId,
    pub rating: i16,
    pub text: Option<String>,
    pub author_name: String,
    pub created_at: Timestamp,
}

/// Review submission body. Bounds are checked in `studiora_core::review`.
#[derive(Debug, Deserialize)]
pub struct CreateReview {
    pub rating: i16,
    pub text: Option<String>,
}

//! Notification entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use studiora_core::types::{DbId, Timestamp};

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for creating an in-app notification.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: DbId,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

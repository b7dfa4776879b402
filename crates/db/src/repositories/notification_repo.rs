//! Repository for the `notifications` table.

use sqlx::PgPool;
use studiora_core::types::DbId;

use crate::models::notification::{CreateNotification, Notification};

const COLUMNS: &str = "id, user_id, kind, title, body, link, is_read, read_at, created_at";

/// Provides CRUD operations for in-app notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateNotification,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (user_id, kind, title, body, link)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(input.user_id)
            .bind(&input.kind)
            .bind(&input.title)
            .bind(&input.body)
            .bind(&input.link)
            .fetch_one(pool)
            .await
    }

    /// Notifications of a user, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(unread_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Mark one notification read. Scoped to `user_id` so users cannot touch
    /// each other's notifications; returns `false` if nothing matched.
    pub async fn mark_read(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW()
             WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

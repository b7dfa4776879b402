//! Repository for the `reviews` table.

use sqlx::PgPool;
use studiora_core::types::DbId;

use crate::models::review::{Review, ReviewWithAuthor};

const COLUMNS: &str = "id, booking_id, studio_id, author_id, rating, text, created_at, updated_at";

pub struct ReviewRepo;

impl ReviewRepo {
    /// Insert a review. The unique constraint on `booking_id` rejects a
    /// second review of the same booking.
    pub async fn create(
        pool: &PgPool,
        booking_id: DbId,
        studio_id: DbId,
        author_id: DbId,
        rating: i16,
        text: Option<&str>,
    ) -> Result<Review, sqlx::Error> {
        let query = format!(
            "INSERT INTO reviews (booking_id, studio_id, author_id, rating, text)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Review>(&query)
            .bind(booking_id)
            .bind(studio_id)
            .bind(author_id)
            .bind(rating)
            .bind(text)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_booking(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Option<Review>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reviews WHERE booking_id = $1");
        sqlx::query_as::<_, Review>(&query)
            .bind(booking_id)
            .fetch_optional(pool)
            .await
    }

    /// Public review list of a studio, newest first.
    pub async fn list_by_studio(
        pool: &PgPool,
        studio_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReviewWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, ReviewWithAuthor>(
            "SELECT rv.id, rv.studio_id, rv.rating, rv.text, u.name AS author_name, rv.created_at
             FROM reviews rv
             JOIN users u ON u.id = rv.author_id
             WHERE rv.studio_id = $1
             ORDER BY rv.created_at DESC, rv.id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(studio_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}

//! Repository for the `promotions` table.

use sqlx::PgPool;
use studiora_core::types::{DbId, Timestamp};

use crate::models::promotion::{CreatePromotion, Promotion};

const COLUMNS: &str = "id, studio_id, plan_code, boost, price, starts_at, ends_at, is_paid, \
                        created_at, updated_at";

pub struct PromotionRepo;

impl PromotionRepo {
    pub async fn create(pool: &PgPool, input: &CreatePromotion) -> Result<Promotion, sqlx::Error> {
        let query = format!(
            "INSERT INTO promotions (studio_id, plan_code, boost, price, starts_at, ends_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Promotion>(&query)
            .bind(input.studio_id)
            .bind(&input.plan_code)
            .bind(input.boost)
            .bind(input.price)
            .bind(input.starts_at)
            .bind(input.ends_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Promotion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM promotions WHERE id = $1");
        sqlx::query_as::<_, Promotion>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All promotions of a studio, paid or not, newest first.
    pub async fn list_by_studio(
        pool: &PgPool,
        studio_id: DbId,
    ) -> Result<Vec<Promotion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM promotions
             WHERE studio_id = $1
             ORDER BY starts_at DESC, id DESC"
        );
        sqlx::query_as::<_, Promotion>(&query)
            .bind(studio_id)
            .fetch_all(pool)
            .await
    }

    /// End of the last paid promotion of a studio, if any.
    pub async fn latest_paid_end(
        pool: &PgPool,
        studio_id: DbId,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        sqlx::query_scalar("SELECT MAX(ends_at) FROM promotions WHERE studio_id = $1 AND is_paid")
            .bind(studio_id)
            .fetch_one(pool)
            .await
    }

    /// Mark a promotion paid, shifting its window to `[starts_at, ends_at)`.
    ///
    /// The window is recomputed at payment time so a promotion paid late
    /// still runs for its full duration. Returns `None` if already paid.
    pub async fn mark_paid(
        pool: &PgPool,
        id: DbId,
        starts_at: Timestamp,
        ends_at: Timestamp,
    ) -> Result<Option<Promotion>, sqlx::Error> {
        let query = format!(
            "UPDATE promotions SET is_paid = TRUE, starts_at = $2, ends_at = $3
             WHERE id = $1 AND NOT is_paid
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Promotion>(&query)
            .bind(id)
            .bind(starts_at)
            .bind(ends_at)
            .fetch_optional(pool)
            .await
    }
}

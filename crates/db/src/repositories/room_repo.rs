//! Repository for the `rooms` table.

use sqlx::PgPool;
use studiora_core::types::DbId;

use crate::models::room::{CreateRoom, Room, UpdateRoom};

const COLUMNS: &str = "id, studio_id, name, description, area_sqm, capacity, hourly_price, \
                        image_urls, is_active, created_at, updated_at";

/// Provides CRUD operations for rooms.
pub struct RoomRepo;

impl RoomRepo {
    pub async fn create(
        pool: &PgPool,
        studio_id: DbId,
        input: &CreateRoom,
    ) -> Result<Room, sqlx::Error> {
        let query = format!(
            "INSERT INTO rooms (studio_id, name, description, area_sqm, capacity, hourly_price, image_urls)
             VALUES ($1, $2, $3, $4, COALESCE($5, 1), $6, COALESCE($7, '{{}}'::text[]))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Room>(&query)
            .bind(studio_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.area_sqm)
            .bind(input.capacity)
            .bind(input.hourly_price)
            .bind(&input.image_urls)
            .fetch_one(pool)
            .await
    }

    /// Find a room whose studio is live. Inactive rooms are still returned.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Room>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rooms
             WHERE id = $1
               AND EXISTS (SELECT 1 FROM studios s WHERE s.id = rooms.studio_id AND s.deleted_at IS NULL)"
        );
        sqlx::query_as::<_, Room>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List rooms of a studio, cheapest first.
    pub async fn list_by_studio(
        pool: &PgPool,
        studio_id: DbId,
        include_inactive: bool,
    ) -> Result<Vec<Room>, sqlx::Error> {
        let filter = if include_inactive { "" } else { "AND is_active" };
        let query = format!(
            "SELECT {COLUMNS} FROM rooms
             WHERE studio_id = $1 {filter}
             ORDER BY hourly_price ASC, id ASC"
        );
        sqlx::query_as::<_, Room>(&query)
            .bind(studio_id)
            .fetch_all(pool)
            .await
    }

    /// Update a room. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateRoom,
    ) -> Result<Option<Room>, sqlx::Error> {
        let query = format!(
            "UPDATE rooms SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                area_sqm = COALESCE($4, area_sqm),
                capacity = COALESCE($5, capacity),
                hourly_price = COALESCE($6, hourly_price),
                image_urls = COALESCE($7, image_urls),
                is_active = COALESCE($8, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Room>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.area_sqm)
            .bind(input.capacity)
            .bind(input.hourly_price)
            .bind(&input.image_urls)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Take a room out of the catalog. Existing bookings are untouched.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE rooms SET is_active = false WHERE id = $1 AND is_active = true")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

//! Repository for the `studios` table and the public catalog.

use sqlx::{PgPool, Postgres, QueryBuilder};
use studiora_core::catalog::{CatalogFilter, SortOrder};
use studiora_core::types::DbId;

use crate::models::studio::{CreateStudio, Studio, StudioCard, UpdateStudio};

const COLUMNS: &str = "id, owner_id, name, description, city, address, phone, image_urls, \
                        rating_avg, reviews_count, deleted_at, created_at, updated_at";

/// Catalog projection. Room aggregates and the running promotion's boost are
/// computed with lateral subqueries so each studio yields exactly one row.
const CARD_SELECT: &str = "SELECT s.id, s.owner_id, s.name, s.city, s.address, s.image_urls, \
        s.rating_avg, s.reviews_count, r.min_hourly_price, r.max_capacity, \
        r.rooms_count, COALESCE(p.boost, 0) AS promotion_boost, s.created_at \
    FROM studios s \
    LEFT JOIN LATERAL ( \
        SELECT MIN(hourly_price) AS min_hourly_price, MAX(capacity) AS max_capacity, \
               COUNT(*) AS rooms_count \
        FROM rooms WHERE studio_id = s.id AND is_active \
    ) r ON TRUE \
    LEFT JOIN LATERAL ( \
        SELECT MAX(boost) AS boost FROM promotions \
        WHERE studio_id = s.id AND is_paid AND starts_at <= NOW() AND ends_at > NOW() \
    ) p ON TRUE \
    WHERE s.deleted_at IS NULL";

/// Provides CRUD and catalog queries for studios.
pub struct StudioRepo;

impl StudioRepo {
    pub async fn create(
        pool: &PgPool,
        owner_id: DbId,
        input: &CreateStudio,
    ) -> Result<Studio, sqlx::Error> {
        let query = format!(
            "INSERT INTO studios (owner_id, name, description, city, address, phone, image_urls)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, '{{}}'::text[]))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Studio>(&query)
            .bind(owner_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.city.trim())
            .bind(&input.address)
            .bind(&input.phone)
            .bind(&input.image_urls)
            .fetch_one(pool)
            .await
    }

    /// Find a live (not soft-deleted) studio.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Studio>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM studios WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Studio>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Catalog page matching `filter`, ordered by `filter.sort`.
    pub async fn list_catalog(
        pool: &PgPool,
        filter: &CatalogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StudioCard>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(CARD_SELECT);
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY ");
        qb.push(order_by(filter.sort));
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);
        qb.build_query_as::<StudioCard>().fetch_all(pool).await
    }

    /// Total number of catalog entries matching `filter`.
    pub async fn count_catalog(pool: &PgPool, filter: &CatalogFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM (");
        qb.push(CARD_SELECT);
        push_filters(&mut qb, filter);
        qb.push(") AS catalog");
        qb.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Single catalog card, used for the studio detail page.
    pub async fn find_card(pool: &PgPool, id: DbId) -> Result<Option<StudioCard>, sqlx::Error> {
        let query = format!("{CARD_SELECT} AND s.id = $1");
        sqlx::query_as::<_, StudioCard>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_owner(pool: &PgPool, owner_id: DbId) -> Result<Vec<Studio>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM studios
             WHERE owner_id = $1 AND deleted_at IS NULL
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Studio>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Update a studio. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateStudio,
    ) -> Result<Option<Studio>, sqlx::Error> {
        let query = format!(
            "UPDATE studios SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                city = COALESCE(btrim($4), city),
                address = COALESCE($5, address),
                phone = COALESCE($6, phone),
                image_urls = COALESCE($7, image_urls)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Studio>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.city)
            .bind(&input.address)
            .bind(&input.phone)
            .bind(&input.image_urls)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a studio. Returns `true` if the row was updated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE studios SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Recompute the denormalized rating average and review count.
    pub async fn refresh_rating(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE studios s SET
                rating_avg = agg.avg_rating,
                reviews_count = agg.cnt
             FROM (
                SELECT ROUND(AVG(rating)::numeric, 1)::float8 AS avg_rating,
                       COUNT(*)::int AS cnt
                FROM reviews WHERE studio_id = $1
             ) agg
             WHERE s.id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &CatalogFilter) {
    if let Some(city) = &filter.city {
        qb.push(" AND lower(s.city) = lower(");
        qb.push_bind(city.clone());
        qb.push(")");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND r.min_hourly_price >= ");
        qb.push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND r.min_hourly_price <= ");
        qb.push_bind(max);
    }
    if let Some(capacity) = filter.min_capacity {
        qb.push(" AND r.max_capacity >= ");
        qb.push_bind(capacity);
    }
    if let Some(q) = &filter.query {
        let pattern = format!("%{}%", escape_like(q));
        qb.push(" AND (s.name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR s.description ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR s.address ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
}

fn order_by(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Recommended => {
            "promotion_boost DESC, s.rating_avg DESC NULLS LAST, s.reviews_count DESC, s.id DESC"
        }
        SortOrder::PriceAsc => "r.min_hourly_price ASC NULLS LAST, s.id DESC",
        SortOrder::PriceDesc => "r.min_hourly_price DESC NULLS LAST, s.id DESC",
        SortOrder::Rating => "s.rating_avg DESC NULLS LAST, s.reviews_count DESC, s.id DESC",
        SortOrder::Newest => "s.created_at DESC, s.id DESC",
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("loft"), "loft");
    }

    #[test]
    fn recommended_puts_promotions_first() {
        assert!(order_by(SortOrder::Recommended).starts_with("promotion_boost DESC"));
    }
}

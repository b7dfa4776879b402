//! Handlers for the `/studios` resource: public catalog and owner management.
//!
//! Catalog pages and studio details are served from [`crate::cache`]; every
//! write that changes what the catalog shows invalidates the `studios:` keys.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use studiora_core::catalog::{clamp_limit, clamp_offset, CatalogFilter, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use studiora_core::error::CoreError;
use studiora_core::types::{DbId, MinorUnits};
use studiora_db::models::room::Room;
use studiora_db::models::studio::{CreateStudio, Studio, UpdateStudio};
use studiora_db::repositories::{RoomRepo, StudioRepo};
use validator::Validate;

use crate::cache::{catalog_key, studio_key};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOwner;
use crate::response::{DataResponse, PageMeta, PagedResponse};
use crate::state::AppState;

/// Query parameters for `GET /studios`.
#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub city: Option<String>,
    pub min_price: Option<MinorUnits>,
    pub max_price: Option<MinorUnits>,
    pub min_capacity: Option<i32>,
    /// Free-text search over name, description and address.
    pub q: Option<String>,
    /// `recommended` (default), `price_asc`, `price_desc`, `rating`, `newest`.
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StudioDetail {
    #[serde(flatten)]
    pub studio: Studio,
    /// Active rooms only.
    pub rooms: Vec<Room>,
}

/// Load a live studio the caller may manage: its owner, or any admin.
pub(crate) async fn load_managed_studio(
    state: &AppState,
    studio_id: DbId,
    user: &AuthUser,
) -> AppResult<Studio> {
    let studio = StudioRepo::find_by_id(&state.pool, studio_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Studio",
            id: studio_id,
        }))?;

    if studio.owner_id != user.user_id && !user.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not manage this studio".into(),
        )));
    }
    Ok(studio)
}

/// GET /api/v1/studios
pub async fn list_catalog(
    State(state): State<AppState>,
    Query(params): Query<CatalogQuery>,
) -> AppResult<Json<Value>> {
    let filter = CatalogFilter::parse(
        params.city.as_deref(),
        params.min_price,
        params.max_price,
        params.min_capacity,
        params.q.as_deref(),
        params.sort.as_deref(),
    )?;
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let offset = clamp_offset(params.offset);

    let key = catalog_key(&filter.cache_key(limit, offset));
    if let Some(cached) = state.cache.get_json::<Value>(&key).await {
        return Ok(Json(cached));
    }

    let (studios, total) = tokio::try_join!(
        StudioRepo::list_catalog(&state.pool, &filter, limit, offset),
        StudioRepo::count_catalog(&state.pool, &filter),
    )?;

    let body = serde_json::to_value(PagedResponse {
        data: studios,
        meta: PageMeta {
            total,
            limit,
            offset,
        },
    })
    .map_err(|e| AppError::InternalError(format!("Catalog serialization error: {e}")))?;

    state.cache.set_json(&key, &body).await;
    Ok(Json(body))
}

/// GET /api/v1/studios/{id}
pub async fn get_studio(
    State(state): State<AppState>,
    Path(studio_id): Path<DbId>,
) -> AppResult<Json<Value>> {
    let key = studio_key(studio_id);
    if let Some(cached) = state.cache.get_json::<Value>(&key).await {
        return Ok(Json(cached));
    }

    let studio = StudioRepo::find_by_id(&state.pool, studio_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Studio",
            id: studio_id,
        }))?;
    let rooms = RoomRepo::list_by_studio(&state.pool, studio_id, false).await?;

    let body = serde_json::to_value(DataResponse {
        data: StudioDetail { studio, rooms },
    })
    .map_err(|e| AppError::InternalError(format!("Studio serialization error: {e}")))?;

    state.cache.set_json(&key, &body).await;
    Ok(Json(body))
}

/// GET /api/v1/studios/mine
pub async fn list_mine(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
) -> AppResult<Json<DataResponse<Vec<Studio>>>> {
    let studios = StudioRepo::list_by_owner(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data: studios }))
}

/// POST /api/v1/studios
pub async fn create_studio(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
    Json(input): Json<CreateStudio>,
) -> AppResult<(StatusCode, Json<DataResponse<Studio>>)> {
    input.validate()?;

    let studio = StudioRepo::create(&state.pool, user.user_id, &input).await?;
    state.cache.invalidate_studios().await;

    tracing::info!(studio_id = studio.id, owner_id = user.user_id, "Studio created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: studio })))
}

/// PUT /api/v1/studios/{id}
pub async fn update_studio(
    State(state): State<AppState>,
    Path(studio_id): Path<DbId>,
    RequireOwner(user): RequireOwner,
    Json(input): Json<UpdateStudio>,
) -> AppResult<Json<DataResponse<Studio>>> {
    input.validate()?;
    load_managed_studio(&state, studio_id, &user).await?;

    let studio = StudioRepo::update(&state.pool, studio_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Studio",
            id: studio_id,
        }))?;
    state.cache.invalidate_studios().await;

    Ok(Json(DataResponse { data: studio }))
}

/// DELETE /api/v1/studios/{id}
///
/// Soft delete. Existing bookings are kept; the studio leaves the catalog
/// and its rooms can no longer be booked.
pub async fn delete_studio(
    State(state): State<AppState>,
    Path(studio_id): Path<DbId>,
    user: AuthUser,
) -> AppResult<StatusCode> {
    load_managed_studio(&state, studio_id, &user).await?;

    if !StudioRepo::soft_delete(&state.pool, studio_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Studio",
            id: studio_id,
        }));
    }
    state.cache.invalidate_studios().await;

    tracing::info!(studio_id, user_id = user.user_id, "Studio deleted");
    Ok(StatusCode::NO_CONTENT)
}

//! Handlers for rooms and their day availability.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use studiora_core::booking::day_window;
use studiora_core::error::CoreError;
use studiora_core::types::DbId;
use studiora_db::models::booking::BusySlot;
use studiora_db::models::room::{CreateRoom, Room, UpdateRoom};
use studiora_db::repositories::{BookingRepo, RoomRepo, StudioRepo};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::studios::load_managed_studio;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOwner;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// UTC day, `YYYY-MM-DD`.
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct Availability {
    pub room_id: DbId,
    pub date: NaiveDate,
    /// Occupied intervals, ordered by start.
    pub busy: Vec<BusySlot>,
}

fn room_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Room", id })
}

/// Load a room of a live studio and check the caller manages that studio.
async fn load_managed_room(state: &AppState, room_id: DbId, user: &AuthUser) -> AppResult<Room> {
    let room = RoomRepo::find_by_id(&state.pool, room_id)
        .await?
        .ok_or_else(|| room_not_found(room_id))?;
    load_managed_studio(state, room.studio_id, user).await?;
    Ok(room)
}

/// GET /api/v1/studios/{id}/rooms
pub async fn list_rooms(
    State(state): State<AppState>,
    Path(studio_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Room>>>> {
    StudioRepo::find_by_id(&state.pool, studio_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Studio",
            id: studio_id,
        }))?;
    let rooms = RoomRepo::list_by_studio(&state.pool, studio_id, false).await?;
    Ok(Json(DataResponse { data: rooms }))
}

/// POST /api/v1/studios/{id}/rooms
pub async fn create_room(
    State(state): State<AppState>,
    Path(studio_id): Path<DbId>,
    RequireOwner(user): RequireOwner,
    Json(input): Json<CreateRoom>,
) -> AppResult<(StatusCode, Json<DataResponse<Room>>)> {
    input.validate()?;
    load_managed_studio(&state, studio_id, &user).await?;

    let room = RoomRepo::create(&state.pool, studio_id, &input).await?;
    state.cache.invalidate_studios().await;

    tracing::info!(room_id = room.id, studio_id, "Room created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: room })))
}

/// GET /api/v1/rooms/{id}
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Room>>> {
    let room = RoomRepo::find_by_id(&state.pool, room_id)
        .await?
        .ok_or_else(|| room_not_found(room_id))?;
    Ok(Json(DataResponse { data: room }))
}

/// PUT /api/v1/rooms/{id}
pub async fn update_room(
    State(state): State<AppState>,
    Path(room_id): Path<DbId>,
    RequireOwner(user): RequireOwner,
    Json(input): Json<UpdateRoom>,
) -> AppResult<Json<DataResponse<Room>>> {
    input.validate()?;
    load_managed_room(&state, room_id, &user).await?;

    let room = RoomRepo::update(&state.pool, room_id, &input)
        .await?
        .ok_or_else(|| room_not_found(room_id))?;
    state.cache.invalidate_studios().await;

    Ok(Json(DataResponse { data: room }))
}

/// DELETE /api/v1/rooms/{id}
///
/// Deactivates the room; bookings already made for it stay valid.
pub async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<DbId>,
    RequireOwner(user): RequireOwner,
) -> AppResult<StatusCode> {
    load_managed_room(&state, room_id, &user).await?;

    if !RoomRepo::deactivate(&state.pool, room_id).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "Room is already inactive".into(),
        )));
    }
    state.cache.invalidate_studios().await;

    tracing::info!(room_id, "Room deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/rooms/{id}/availability?date=YYYY-MM-DD
pub async fn availability(
    State(state): State<AppState>,
    Path(room_id): Path<DbId>,
    Query(params): Query<AvailabilityQuery>,
) -> AppResult<Json<DataResponse<Availability>>> {
    let date = NaiveDate::parse_from_str(params.date.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::Core(CoreError::Validation(
            "date must be formatted as YYYY-MM-DD".into(),
        ))
    })?;

    RoomRepo::find_by_id(&state.pool, room_id)
        .await?
        .ok_or_else(|| room_not_found(room_id))?;

    let window = day_window(date)?;
    let busy = BookingRepo::busy_slots(
        &state.pool,
        room_id,
        window.start,
        window.end,
        state.config.booking.payment_timeout_mins,
    )
    .await?;

    Ok(Json(DataResponse {
        data: Availability {
            room_id,
            date,
            busy,
        },
    }))
}

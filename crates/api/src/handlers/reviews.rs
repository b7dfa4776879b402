//! Handlers for studio reviews.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use studiora_core::error::CoreError;
use studiora_core::review::{check_can_review, validate_review};
use studiora_core::types::DbId;
use studiora_db::models::review::{CreateReview, Review, ReviewWithAuthor};
use studiora_db::repositories::{BookingRepo, ReviewRepo, StudioRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::notify::review_event;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/studios/{id}/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(studio_id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<ReviewWithAuthor>>>> {
    let (limit, offset) = params.clamped();
    let reviews = ReviewRepo::list_by_studio(&state.pool, studio_id, limit, offset).await?;
    Ok(Json(DataResponse { data: reviews }))
}

/// POST /api/v1/bookings/{id}/review
///
/// One review per completed booking, by its client. The studio's rating
/// aggregate is recomputed afterwards.
pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(booking_id): Path<DbId>,
    Json(input): Json<CreateReview>,
) -> AppResult<(StatusCode, Json<DataResponse<Review>>)> {
    let text = input
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    validate_review(input.rating, text)?;

    let booking = BookingRepo::find_detail(&state.pool, booking_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Booking",
            id: booking_id,
        }))?;
    check_can_review(booking.status()?, booking.client_id, auth.user_id)?;

    if ReviewRepo::find_by_booking(&state.pool, booking_id)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "This booking has already been reviewed".into(),
        )));
    }

    // The unique constraint still catches a concurrent duplicate (409).
    let review = ReviewRepo::create(
        &state.pool,
        booking_id,
        booking.studio_id,
        auth.user_id,
        input.rating,
        text,
    )
    .await?;

    StudioRepo::refresh_rating(&state.pool, booking.studio_id).await?;
    state.cache.invalidate_studios().await;

    tracing::info!(
        review_id = review.id,
        studio_id = booking.studio_id,
        rating = review.rating,
        "Review created"
    );
    state.event_bus.publish(review_event(
        review.id,
        auth.user_id,
        booking.owner_id,
        booking.studio_id,
        &booking.studio_name,
        review.rating,
    ));

    Ok((StatusCode::CREATED, Json(DataResponse { data: review })))
}

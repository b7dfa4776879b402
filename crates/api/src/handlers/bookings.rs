//! Handlers for the `/bookings` resource.
//!
//! Slot conflicts are resolved in [`BookingRepo::create`]. Every status
//! change here is a compare-and-set on the status the handler observed, so
//! racing requests (client cancel vs. webhook confirm, owner complete vs.
//! client cancel) apply at most one transition and the loser gets 409.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use studiora_core::booking::{
    calculate_price, check_cancellation, check_completion, payment_window_elapsed,
    validate_booking_window, BookingStatus, Canceller, TimeRange,
};
use studiora_core::error::CoreError;
use studiora_core::payment::{PaymentPurpose, PaymentStatus, CURRENCY};
use studiora_core::types::DbId;
use studiora_db::models::booking::{Booking, BookingDetail, CancelBooking, CreateBooking, NewBooking};
use studiora_db::models::payment::{CreatePayment, Payment};
use studiora_db::repositories::{
    BookingCheckout, BookingRepo, CreateBookingOutcome, PaymentRepo, RoomRepo, StudioRepo,
};
use studiora_events::bus::{BOOKING_CANCELLED, BOOKING_COMPLETED, BOOKING_CREATED};
use studiora_payments::CreatePaymentRequest;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::payments::{refund_booking_payment, release_pending_payment, RefundOutcome};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOwner;
use crate::notify::booking_event;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl BookingListQuery {
    fn status(&self) -> AppResult<Option<BookingStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => Ok(Some(s.parse()?)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub booking: Booking,
    /// Outcome of refunding a paid booking; absent when nothing was paid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundOutcome>,
}

#[derive(Debug, Serialize)]
pub struct PaymentLink {
    pub payment: Payment,
    /// Hosted payment page the client must be redirected to.
    pub confirmation_url: Option<String>,
}

fn booking_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Booking",
        id,
    })
}

fn status_changed() -> AppError {
    AppError::Core(CoreError::Conflict(
        "Booking status changed concurrently, reload and retry".into(),
    ))
}

async fn load_detail(state: &AppState, booking_id: DbId) -> AppResult<BookingDetail> {
    BookingRepo::find_detail(&state.pool, booking_id)
        .await?
        .ok_or_else(|| booking_not_found(booking_id))
}

/// POST /api/v1/bookings
///
/// Creates a pending booking that holds the slot for the payment window.
pub async fn create_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateBooking>,
) -> AppResult<(StatusCode, Json<DataResponse<Booking>>)> {
    input.validate()?;

    let range = TimeRange::new(input.starts_at, input.ends_at)?;
    validate_booking_window(&range, Utc::now())?;

    let room = RoomRepo::find_by_id(&state.pool, input.room_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Room",
            id: input.room_id,
        }))?;
    if !room.is_active {
        return Err(AppError::Core(CoreError::Conflict(
            "This room is not available for booking".into(),
        )));
    }
    let studio = StudioRepo::find_by_id(&state.pool, room.studio_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Studio",
            id: room.studio_id,
        }))?;
    if studio.owner_id == auth.user_id {
        return Err(AppError::Core(CoreError::Validation(
            "You cannot book a room in your own studio".into(),
        )));
    }

    let total_price = calculate_price(room.hourly_price, &range)?;
    let new_booking = NewBooking {
        room_id: room.id,
        client_id: auth.user_id,
        starts_at: range.start,
        ends_at: range.end,
        total_price,
        comment: input.comment,
    };

    let booking = match BookingRepo::create(
        &state.pool,
        &new_booking,
        state.config.booking.payment_timeout_mins,
    )
    .await?
    {
        CreateBookingOutcome::Created(booking) => booking,
        CreateBookingOutcome::RoomUnavailable => {
            return Err(AppError::Core(CoreError::Conflict(
                "This room is not available for booking".into(),
            )))
        }
        CreateBookingOutcome::Conflict => {
            return Err(AppError::Core(CoreError::Conflict(
                "The selected time slot is already booked".into(),
            )))
        }
    };

    tracing::info!(
        booking_id = booking.id,
        room_id = booking.room_id,
        client_id = auth.user_id,
        total_price = booking.total_price,
        "Booking created"
    );

    if let Some(detail) = BookingRepo::find_detail(&state.pool, booking.id).await? {
        state
            .event_bus
            .publish(booking_event(BOOKING_CREATED, &detail).with_actor(auth.user_id));
    }

    Ok((StatusCode::CREATED, Json(DataResponse { data: booking })))
}

/// GET /api/v1/bookings
pub async fn list_my_bookings(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<BookingListQuery>,
) -> AppResult<Json<DataResponse<Vec<BookingDetail>>>> {
    let status = params.status()?;
    let (limit, offset) = crate::query::PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .clamped();

    let bookings =
        BookingRepo::list_for_client(&state.pool, auth.user_id, status, limit, offset).await?;
    Ok(Json(DataResponse { data: bookings }))
}

/// GET /api/v1/bookings/owner
pub async fn list_owner_bookings(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
    Query(params): Query<BookingListQuery>,
) -> AppResult<Json<DataResponse<Vec<BookingDetail>>>> {
    let status = params.status()?;
    let (limit, offset) = crate::query::PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .clamped();

    let bookings =
        BookingRepo::list_for_owner(&state.pool, user.user_id, status, limit, offset).await?;
    Ok(Json(DataResponse { data: bookings }))
}

/// GET /api/v1/bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(booking_id): Path<DbId>,
) -> AppResult<Json<DataResponse<BookingDetail>>> {
    let detail = load_detail(&state, booking_id).await?;
    if detail.client_id != auth.user_id && detail.owner_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "You are not a party to this booking".into(),
        )));
    }
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/bookings/{id}/cancel
///
/// Clients cancel their own bookings (confirmed ones only outside the
/// cutoff); studio owners may cancel any open booking of their studio.
/// A paid booking is refunded in full after the cancellation is recorded.
pub async fn cancel_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(booking_id): Path<DbId>,
    body: Option<Json<CancelBooking>>,
) -> AppResult<Json<DataResponse<CancelResponse>>> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    input.validate()?;

    let detail = load_detail(&state, booking_id).await?;
    let canceller = if detail.owner_id == auth.user_id || auth.is_admin() {
        Canceller::Owner
    } else if detail.client_id == auth.user_id {
        Canceller::Client
    } else {
        return Err(AppError::Core(CoreError::Forbidden(
            "You are not a party to this booking".into(),
        )));
    };

    let status = detail.status()?;
    check_cancellation(status, detail.starts_at, Utc::now(), canceller)?;

    let reason = input
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let booking = BookingRepo::cancel(&state.pool, booking_id, status, Some(auth.user_id), reason)
        .await?
        .ok_or_else(status_changed)?;

    tracing::info!(booking_id, user_id = auth.user_id, ?canceller, "Booking cancelled");

    let refund = match status {
        BookingStatus::Confirmed => {
            Some(refund_booking_payment(&state, booking_id, booking.payment_id).await)
        }
        _ => {
            release_pending_payment(&state, booking_id).await;
            None
        }
    };

    let mut cancelled_detail = detail;
    cancelled_detail.status = booking.status.clone();
    cancelled_detail.cancel_reason = booking.cancel_reason.clone();
    state.event_bus.publish(
        booking_event(BOOKING_CANCELLED, &cancelled_detail).with_actor(auth.user_id),
    );

    Ok(Json(DataResponse {
        data: CancelResponse { booking, refund },
    }))
}

/// POST /api/v1/bookings/{id}/complete
pub async fn complete_booking(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
    Path(booking_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Booking>>> {
    let detail = load_detail(&state, booking_id).await?;
    if detail.owner_id != user.user_id && !user.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not manage this studio".into(),
        )));
    }

    let status = detail.status()?;
    check_completion(status, detail.ends_at, Utc::now())?;

    let booking = BookingRepo::transition(
        &state.pool,
        booking_id,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
    )
    .await?
    .ok_or_else(status_changed)?;

    tracing::info!(booking_id, "Booking completed");
    state
        .event_bus
        .publish(booking_event(BOOKING_COMPLETED, &detail).with_actor(user.user_id));

    Ok(Json(DataResponse { data: booking }))
}

/// POST /api/v1/bookings/{id}/pay
///
/// Starts (or resumes) checkout for a pending booking and returns the
/// gateway's hosted payment page.
pub async fn pay_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(booking_id): Path<DbId>,
) -> AppResult<Json<DataResponse<PaymentLink>>> {
    let detail = load_detail(&state, booking_id).await?;
    if detail.client_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the client who made the booking can pay for it".into(),
        )));
    }
    if detail.status()? != BookingStatus::Pending {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Booking is {}, only pending bookings can be paid",
            detail.status
        ))));
    }
    let timeout = i64::from(state.config.booking.payment_timeout_mins);
    if payment_window_elapsed(detail.created_at, Utc::now(), timeout) {
        return Err(AppError::Core(CoreError::Conflict(
            "The payment window for this booking has expired".into(),
        )));
    }

    let gateway = state.gateway()?;

    let checkout = PaymentRepo::open_booking_checkout(
        &state.pool,
        &CreatePayment {
            purpose: PaymentPurpose::Booking,
            booking_id: Some(booking_id),
            promotion_id: None,
            payer_id: auth.user_id,
            amount: detail.total_price,
            currency: CURRENCY.to_string(),
        },
    )
    .await?;
    let payment = match checkout {
        BookingCheckout::Started(payment) => payment,
        // Resume an open checkout instead of charging twice.
        BookingCheckout::Existing(existing) => {
            let confirmation_url = existing.confirmation_url.clone();
            return Ok(Json(DataResponse {
                data: PaymentLink {
                    payment: existing,
                    confirmation_url,
                },
            }));
        }
        BookingCheckout::InProgress => {
            return Err(AppError::Core(CoreError::Conflict(
                "A checkout for this booking is already being created".into(),
            )));
        }
    };

    let request = CreatePaymentRequest {
        payment_id: payment.id,
        purpose: PaymentPurpose::Booking.as_str().to_string(),
        amount: payment.amount,
        currency: payment.currency.clone(),
        description: format!(
            "Booking #{booking_id}: {} at {}",
            detail.room_name, detail.studio_name
        ),
        return_url: state
            .config
            .booking
            .return_url(&format!("/bookings/{booking_id}")),
    };

    let gateway_payment = match gateway.create_payment(&request).await {
        Ok(p) => p,
        Err(e) => {
            PaymentRepo::update_status(
                &state.pool,
                payment.id,
                PaymentStatus::Pending,
                PaymentStatus::Canceled,
            )
            .await?;
            return Err(e.into());
        }
    };

    let payment = PaymentRepo::attach_gateway(
        &state.pool,
        payment.id,
        &gateway_payment.id,
        gateway_payment.confirmation_url.as_deref(),
    )
    .await?;

    tracing::info!(
        booking_id,
        payment_id = payment.id,
        gateway_payment_id = %gateway_payment.id,
        "Checkout started"
    );

    let confirmation_url = payment.confirmation_url.clone();
    Ok(Json(DataResponse {
        data: PaymentLink {
            payment,
            confirmation_url,
        },
    }))
}

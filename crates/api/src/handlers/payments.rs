//! Payment gateway webhook, payment lookup, and the refund helpers used when
//! bookings are cancelled.
//!
//! The webhook body only identifies the payment. Its status is re-read from
//! the gateway and reconciled against the local row, so forged or replayed
//! notifications cannot move a payment anywhere the gateway does not agree.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use studiora_core::booking::{payment_window_elapsed, BookingStatus};
use studiora_core::error::CoreError;
use studiora_core::payment::{reconcile, PaymentPurpose, PaymentStatus, Reconciliation};
use studiora_core::promotion::{plan_by_code, promotion_window};
use studiora_core::types::DbId;
use studiora_db::models::payment::Payment;
use studiora_db::repositories::{BookingRepo, PaymentRepo, PromotionRepo, StudioRepo};
use studiora_events::bus::{BOOKING_CANCELLED, BOOKING_CONFIRMED};
use studiora_payments::{WebhookEvent, WebhookNotification};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::notify::{booking_event, payment_event, promotion_event};
use crate::response::DataResponse;
use crate::state::AppState;

const LATE_PAYMENT_REASON: &str = "Payment arrived after the payment window closed";
const PAYMENT_CANCELED_REASON: &str = "Payment was cancelled";

/// What happened to the money of a cancelled booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundOutcome {
    Refunded,
    /// Nothing was charged.
    NotRequired,
    /// The gateway refused or was unreachable; needs manual follow-up.
    Failed,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub payment_id: Option<DbId>,
    pub status: Option<PaymentStatus>,
    pub applied: bool,
}

impl WebhookAck {
    fn ignored() -> Self {
        Self {
            payment_id: None,
            status: None,
            applied: false,
        }
    }
}

/// POST /api/v1/payments/webhook
///
/// Always answers 200 for notifications that were understood, including
/// duplicates and unknown events, so the gateway stops retrying. Gateway
/// lookup failures return 502 and are retried.
pub async fn webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<DataResponse<WebhookAck>>> {
    let notification = WebhookNotification::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Malformed notification: {e}")))?;

    let event = notification.event();
    if let WebhookEvent::Other(name) = &event {
        tracing::debug!(event = %name, "Ignoring unsupported gateway event");
        return Ok(Json(DataResponse {
            data: WebhookAck::ignored(),
        }));
    }

    let gateway_id = notification
        .gateway_payment_id()
        .map_err(|e| AppError::BadRequest(e.to_string()))?
        .to_string();

    let gateway = state.gateway()?;
    let remote = gateway.get_payment(&gateway_id).await?;

    let Some(payment) = PaymentRepo::find_by_gateway_id(&state.pool, &gateway_id).await? else {
        tracing::warn!(gateway_payment_id = %gateway_id, "Notification for unknown payment");
        return Ok(Json(DataResponse {
            data: WebhookAck::ignored(),
        }));
    };

    let current = payment.status()?;
    let reported = remote.status;
    if event.implied_status().is_some_and(|claimed| claimed != reported) {
        tracing::info!(
            payment_id = payment.id,
            event = %notification.event,
            reported = %reported,
            "Notification is stale, using the status reported by the gateway"
        );
    }

    let (payment, applied) = match reconcile(current, reported) {
        Reconciliation::Apply(next) => {
            match PaymentRepo::update_status(&state.pool, payment.id, current, next).await? {
                Some(updated) => (updated, true),
                // A concurrent notification got there first.
                None => (reload_payment(&state, payment.id).await?, false),
            }
        }
        Reconciliation::Ignore => (payment, false),
        Reconciliation::Reject => {
            tracing::warn!(
                payment_id = payment.id,
                current = %current,
                reported = %reported,
                "Gateway reported a status that contradicts the local payment"
            );
            (payment, false)
        }
    };

    PaymentRepo::record_event(&state.pool, payment.id, &notification.event, reported, applied)
        .await?;

    if applied {
        tracing::info!(
            payment_id = payment.id,
            from = %current,
            to = %payment.status,
            "Payment status updated"
        );
    }

    // Settlement is idempotent, so a retried notification finishes work a
    // failed attempt left behind.
    match payment.status()? {
        PaymentStatus::Succeeded => settle_succeeded(&state, &payment, applied).await?,
        PaymentStatus::Canceled if applied => settle_canceled(&state, &payment).await?,
        _ => {}
    }

    Ok(Json(DataResponse {
        data: WebhookAck {
            payment_id: Some(payment.id),
            status: Some(payment.status()?),
            applied,
        },
    }))
}

/// GET /api/v1/payments/{id}
pub async fn get_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(payment_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Payment>>> {
    let payment = reload_payment(&state, payment_id).await?;
    if payment.payer_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "This payment belongs to another user".into(),
        )));
    }
    Ok(Json(DataResponse { data: payment }))
}

async fn reload_payment(state: &AppState, payment_id: DbId) -> AppResult<Payment> {
    PaymentRepo::find_by_id(&state.pool, payment_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Payment",
            id: payment_id,
        }))
}

async fn settle_succeeded(state: &AppState, payment: &Payment, newly_paid: bool) -> AppResult<()> {
    if newly_paid {
        state.event_bus.publish(payment_event(payment));
    }
    match payment.purpose()? {
        PaymentPurpose::Booking => match payment.booking_id {
            Some(booking_id) => confirm_booking(state, payment, booking_id).await,
            None => Ok(()),
        },
        PaymentPurpose::Promotion => match payment.promotion_id {
            Some(promotion_id) => activate_promotion(state, payment, promotion_id).await,
            None => Ok(()),
        },
    }
}

/// Confirm the paid booking, or refund when it can no longer be honoured.
async fn confirm_booking(state: &AppState, payment: &Payment, booking_id: DbId) -> AppResult<()> {
    let Some(detail) = BookingRepo::find_detail(&state.pool, booking_id).await? else {
        return Ok(());
    };

    match detail.status()? {
        BookingStatus::Pending => {
            let timeout = i64::from(state.config.booking.payment_timeout_mins);
            if payment_window_elapsed(detail.created_at, Utc::now(), timeout) {
                // The slot may already be held by someone else.
                if let Some(booking) = BookingRepo::cancel(
                    &state.pool,
                    booking_id,
                    BookingStatus::Pending,
                    None,
                    Some(LATE_PAYMENT_REASON),
                )
                .await?
                {
                    tracing::warn!(booking_id, "Late payment, booking cancelled");
                    let mut cancelled = detail;
                    cancelled.status = booking.status;
                    cancelled.cancel_reason = booking.cancel_reason;
                    state
                        .event_bus
                        .publish(booking_event(BOOKING_CANCELLED, &cancelled));
                }
                refund_payment(state, payment).await;
                return Ok(());
            }

            if BookingRepo::confirm_paid(&state.pool, booking_id, payment.id)
                .await?
                .is_some()
            {
                tracing::info!(booking_id, payment_id = payment.id, "Booking confirmed");
                state
                    .event_bus
                    .publish(booking_event(BOOKING_CONFIRMED, &detail));
                return Ok(());
            }

            // Lost the race to a cancellation or to another payment.
            let Some(booking) = BookingRepo::find_by_id(&state.pool, booking_id).await? else {
                return Ok(());
            };
            if booking.payment_id != Some(payment.id) {
                tracing::warn!(
                    booking_id,
                    payment_id = payment.id,
                    status = %booking.status,
                    "Booking left pending before this payment settled"
                );
                refund_payment(state, payment).await;
            }
            Ok(())
        }
        BookingStatus::Cancelled => {
            tracing::warn!(booking_id, payment_id = payment.id, "Payment for cancelled booking");
            refund_payment(state, payment).await;
            Ok(())
        }
        BookingStatus::Confirmed | BookingStatus::Completed => {
            if detail.payment_id != Some(payment.id) {
                tracing::warn!(
                    booking_id,
                    payment_id = payment.id,
                    confirmed_by = ?detail.payment_id,
                    "Duplicate payment for an already paid booking"
                );
                refund_payment(state, payment).await;
            }
            Ok(())
        }
    }
}

async fn activate_promotion(
    state: &AppState,
    payment: &Payment,
    promotion_id: DbId,
) -> AppResult<()> {
    let Some(promotion) = PromotionRepo::find_by_id(&state.pool, promotion_id).await? else {
        return Ok(());
    };
    if promotion.is_paid {
        return Ok(());
    }

    let plan = plan_by_code(&promotion.plan_code)?;
    let current_end = PromotionRepo::latest_paid_end(&state.pool, promotion.studio_id).await?;
    let (starts_at, ends_at) = promotion_window(plan, Utc::now(), current_end);

    let Some(promotion) =
        PromotionRepo::mark_paid(&state.pool, promotion_id, starts_at, ends_at).await?
    else {
        return Ok(());
    };
    state.cache.invalidate_studios().await;

    let studio_name = StudioRepo::find_by_id(&state.pool, promotion.studio_id)
        .await?
        .map(|s| s.name)
        .unwrap_or_default();

    tracing::info!(
        promotion_id,
        studio_id = promotion.studio_id,
        %starts_at,
        %ends_at,
        "Promotion activated"
    );
    state
        .event_bus
        .publish(promotion_event(&promotion, payment.payer_id, &studio_name));
    Ok(())
}

/// A checkout the client abandoned releases its pending booking.
async fn settle_canceled(state: &AppState, payment: &Payment) -> AppResult<()> {
    let Some(booking_id) = payment.booking_id else {
        return Ok(());
    };
    let Some(detail) = BookingRepo::find_detail(&state.pool, booking_id).await? else {
        return Ok(());
    };
    if detail.status()? != BookingStatus::Pending {
        return Ok(());
    }

    if let Some(booking) = BookingRepo::cancel(
        &state.pool,
        booking_id,
        BookingStatus::Pending,
        None,
        Some(PAYMENT_CANCELED_REASON),
    )
    .await?
    {
        tracing::info!(booking_id, payment_id = payment.id, "Booking released after payment cancel");
        let mut cancelled = detail;
        cancelled.status = booking.status;
        cancelled.cancel_reason = booking.cancel_reason;
        state
            .event_bus
            .publish(booking_event(BOOKING_CANCELLED, &cancelled));
    }
    Ok(())
}

/// Refund whatever is still captured on the payment that confirmed a
/// booking, falling back to its latest payment.
///
/// Never fails the caller: the booking is already cancelled, so gateway
/// problems are logged and reported as [`RefundOutcome::Failed`].
pub(crate) async fn refund_booking_payment(
    state: &AppState,
    booking_id: DbId,
    confirmed_by: Option<DbId>,
) -> RefundOutcome {
    let payment = match confirmed_by {
        Some(payment_id) => PaymentRepo::find_by_id(&state.pool, payment_id).await,
        None => PaymentRepo::find_latest_for_booking(&state.pool, booking_id).await,
    };
    match payment {
        Ok(Some(payment)) => refund_payment(state, &payment).await,
        Ok(None) => RefundOutcome::NotRequired,
        Err(e) => {
            tracing::error!(booking_id, error = %e, "Failed to load payment for refund");
            RefundOutcome::Failed
        }
    }
}

pub(crate) async fn refund_payment(state: &AppState, payment: &Payment) -> RefundOutcome {
    if payment.status().ok() != Some(PaymentStatus::Succeeded) {
        return RefundOutcome::NotRequired;
    }
    let remaining = payment.amount - payment.refunded_amount;
    if remaining <= 0 {
        return RefundOutcome::NotRequired;
    }
    let (Ok(gateway), Some(gateway_id)) = (state.gateway(), payment.gateway_payment_id.as_deref())
    else {
        tracing::error!(payment_id = payment.id, "Cannot refund: gateway unavailable");
        return RefundOutcome::Failed;
    };

    if let Err(e) = gateway
        .create_refund(gateway_id, remaining, &payment.currency)
        .await
    {
        tracing::error!(payment_id = payment.id, error = %e, "Gateway refund failed");
        return RefundOutcome::Failed;
    }

    match PaymentRepo::record_refund(&state.pool, payment.id, remaining).await {
        Ok(Some(_)) => {
            tracing::info!(payment_id = payment.id, amount = remaining, "Payment refunded");
            RefundOutcome::Refunded
        }
        Ok(None) => {
            tracing::warn!(payment_id = payment.id, "Refund already recorded");
            RefundOutcome::Refunded
        }
        Err(e) => {
            tracing::error!(payment_id = payment.id, error = %e, "Refund sent but not recorded");
            RefundOutcome::Refunded
        }
    }
}

/// Cancel an open checkout of a booking that no longer needs paying for.
///
/// Best effort: a checkout the gateway refuses to cancel expires on its own
/// and a late success is refunded by the webhook.
pub(crate) async fn release_pending_payment(state: &AppState, booking_id: DbId) {
    let payment = match PaymentRepo::find_latest_for_booking(&state.pool, booking_id).await {
        Ok(Some(p)) => p,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(booking_id, error = %e, "Failed to load pending payment");
            return;
        }
    };
    let Ok(status) = payment.status() else {
        return;
    };
    if !matches!(
        status,
        PaymentStatus::Pending | PaymentStatus::WaitingForCapture
    ) {
        return;
    }

    if let (Ok(gateway), Some(gateway_id)) =
        (state.gateway(), payment.gateway_payment_id.as_deref())
    {
        if let Err(e) = gateway.cancel_payment(gateway_id).await {
            tracing::warn!(payment_id = payment.id, error = %e, "Gateway cancel failed");
            return;
        }
    }

    if let Err(e) =
        PaymentRepo::update_status(&state.pool, payment.id, status, PaymentStatus::Canceled).await
    {
        tracing::warn!(payment_id = payment.id, error = %e, "Failed to mark payment cancelled");
    }
}

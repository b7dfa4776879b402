//! Time-driven booking transitions.
//!
//! Pending bookings whose payment window elapsed are cancelled, freeing the
//! slot; confirmed bookings whose session ended are completed. Both updates
//! are single guarded statements, so they never clobber a concurrent
//! webhook or user action.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use studiora_db::models::booking::Booking;
use studiora_db::repositories::BookingRepo;
use studiora_events::bus::{BOOKING_CANCELLED, BOOKING_COMPLETED};
use studiora_events::EventBus;
use tokio_util::sync::CancellationToken;

use crate::notify::booking_event;

/// How often the lifecycle sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Counts from one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub completed: usize,
}

/// Run the lifecycle loop until `cancel` is triggered.
pub async fn run(
    pool: PgPool,
    event_bus: Arc<EventBus>,
    payment_timeout_mins: i32,
    cancel: CancellationToken,
) {
    tracing::info!(
        payment_timeout_mins,
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Booking lifecycle job started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Booking lifecycle job stopping");
                break;
            }
            _ = interval.tick() => {
                match sweep(&pool, &event_bus, payment_timeout_mins).await {
                    Ok(report) if report != SweepReport::default() => {
                        tracing::info!(
                            expired = report.expired,
                            completed = report.completed,
                            "Booking lifecycle: bookings updated"
                        );
                    }
                    Ok(_) => tracing::debug!("Booking lifecycle: nothing to do"),
                    Err(e) => tracing::error!(error = %e, "Booking lifecycle: sweep failed"),
                }
            }
        }
    }
}

/// One pass: expire stale pending bookings, then complete finished ones.
pub async fn sweep(
    pool: &PgPool,
    event_bus: &EventBus,
    payment_timeout_mins: i32,
) -> Result<SweepReport, sqlx::Error> {
    let expired = BookingRepo::expire_stale_pending(pool, payment_timeout_mins).await?;
    publish_all(pool, event_bus, BOOKING_CANCELLED, &expired).await;

    let completed = BookingRepo::complete_finished(pool).await?;
    publish_all(pool, event_bus, BOOKING_COMPLETED, &completed).await;

    Ok(SweepReport {
        expired: expired.len(),
        completed: completed.len(),
    })
}

async fn publish_all(pool: &PgPool, event_bus: &EventBus, event_type: &str, bookings: &[Booking]) {
    for booking in bookings {
        match BookingRepo::find_detail(pool, booking.id).await {
            Ok(Some(detail)) => event_bus.publish(booking_event(event_type, &detail)),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(booking_id = booking.id, error = %e, "Failed to load booking for event");
            }
        }
    }
}

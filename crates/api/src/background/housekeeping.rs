//! Periodic cleanup of in-process and session state.
//!
//! Forgets idle rate-limit keys and expired cache entries, and deletes
//! expired or revoked login sessions.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use studiora_db::repositories::SessionRepo;
use tokio_util::sync::CancellationToken;

use crate::cache::Cache;
use crate::rate_limit::RateLimiter;

/// Sessions are pruned once every this many ticks.
const SESSION_CLEANUP_EVERY: u32 = 60;

/// Run the housekeeping loop until `cancel` is triggered.
///
/// Ticks once per rate-limit window.
pub async fn run(
    pool: PgPool,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<Cache>,
    cancel: CancellationToken,
) {
    let period = rate_limiter.window().max(Duration::from_secs(1));
    tracing::info!(interval_secs = period.as_secs(), "Housekeeping job started");

    let mut interval = tokio::time::interval(period);
    let mut ticks: u32 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Housekeeping job stopping");
                break;
            }
            _ = interval.tick() => {
                rate_limiter.sweep();
                let entries = cache.purge_expired().await;
                if entries > 0 {
                    tracing::debug!(
                        entries,
                        tracked_keys = rate_limiter.tracked_keys(),
                        "Housekeeping: dropped stale entries"
                    );
                }

                ticks = ticks.wrapping_add(1);
                if ticks % SESSION_CLEANUP_EVERY == 0 {
                    match SessionRepo::purge_expired(&pool).await {
                        Ok(0) => {}
                        Ok(deleted) => tracing::info!(deleted, "Housekeeping: pruned sessions"),
                        Err(e) => tracing::error!(error = %e, "Housekeeping: session cleanup failed"),
                    }
                }
            }
        }
    }
}

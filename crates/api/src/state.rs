use std::sync::Arc;

use studiora_payments::PaymentGateway;

use crate::cache::Cache;
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::rate_limit::RateLimiter;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind `Arc` or is itself a handle.
#[derive(Clone)]
pub struct AppState {
    pub pool: studiora_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Domain events consumed by the notification router.
    pub event_bus: Arc<studiora_events::EventBus>,
    /// `None` when the gateway credentials are not configured.
    pub payments: Option<Arc<dyn PaymentGateway>>,
    pub cache: Arc<Cache>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// The configured payment gateway, or 503 when payments are disabled.
    pub fn gateway(&self) -> AppResult<&Arc<dyn PaymentGateway>> {
        self.payments
            .as_ref()
            .ok_or_else(|| AppError::ServiceUnavailable("Online payments are not configured".into()))
    }
}

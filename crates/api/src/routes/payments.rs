//! Route definitions for the `/payments` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::payments;
use crate::state::AppState;

/// Routes mounted at `/payments`.
///
/// ```text
/// POST   /webhook    -> webhook (called by the gateway, unauthenticated)
/// GET    /{id}       -> get_payment (payer)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(payments::webhook))
        .route("/{id}", get(payments::get_payment))
}

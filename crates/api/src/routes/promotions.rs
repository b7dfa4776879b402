use axum::routing::get;
use axum::Router;

use crate::handlers::promotions;
use crate::state::AppState;

/// Routes mounted at `/promotions`. Purchases live under `/studios/{id}`.
pub fn router() -> Router<AppState> {
    Router::new().route("/plans", get(promotions::list_plans))
}

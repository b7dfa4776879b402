//! Route definitions for the `/bookings` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{bookings, reviews};
use crate::state::AppState;

/// Routes mounted at `/bookings`. All require authentication.
///
/// ```text
/// POST   /                  -> create_booking
/// GET    /                  -> list_my_bookings
/// GET    /owner             -> list_owner_bookings
/// GET    /{id}              -> get_booking
/// POST   /{id}/cancel       -> cancel_booking
/// POST   /{id}/complete     -> complete_booking
/// POST   /{id}/pay          -> pay_booking
/// POST   /{id}/review       -> create_review
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(bookings::list_my_bookings).post(bookings::create_booking),
        )
        .route("/owner", get(bookings::list_owner_bookings))
        .route("/{id}", get(bookings::get_booking))
        .route("/{id}/cancel", post(bookings::cancel_booking))
        .route("/{id}/complete", post(bookings::complete_booking))
        .route("/{id}/pay", post(bookings::pay_booking))
        .route("/{id}/review", post(reviews::create_review))
}

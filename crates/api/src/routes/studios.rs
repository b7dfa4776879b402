//! Route definitions for the `/studios` resource and its nested rooms,
//! reviews and promotions.

use axum::routing::get;
use axum::Router;

use crate::handlers::{promotions, reviews, rooms, studios};
use crate::state::AppState;

/// Routes mounted at `/studios`.
///
/// ```text
/// GET    /                   -> list_catalog (public, cached)
/// POST   /                   -> create_studio (owner)
/// GET    /mine               -> list_mine (owner)
/// GET    /{id}               -> get_studio (public, cached)
/// PUT    /{id}               -> update_studio
/// DELETE /{id}               -> delete_studio
/// GET    /{id}/rooms         -> list_rooms (public)
/// POST   /{id}/rooms         -> create_room
/// GET    /{id}/reviews       -> list_reviews (public)
/// GET    /{id}/promotions    -> list_promotions
/// POST   /{id}/promotions    -> buy_promotion
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(studios::list_catalog).post(studios::create_studio),
        )
        .route("/mine", get(studios::list_mine))
        .route(
            "/{id}",
            get(studios::get_studio)
                .put(studios::update_studio)
                .delete(studios::delete_studio),
        )
        .route(
            "/{id}/rooms",
            get(rooms::list_rooms).post(rooms::create_room),
        )
        .route("/{id}/reviews", get(reviews::list_reviews))
        .route(
            "/{id}/promotions",
            get(promotions::list_promotions).post(promotions::buy_promotion),
        )
}

//! Route definitions for the `/rooms` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::rooms;
use crate::state::AppState;

/// Routes mounted at `/rooms`.
///
/// ```text
/// GET    /{id}                -> get_room (public)
/// PUT    /{id}                -> update_room
/// DELETE /{id}                -> delete_room (deactivate)
/// GET    /{id}/availability   -> availability (public)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(rooms::get_room)
                .put(rooms::update_room)
                .delete(rooms::delete_room),
        )
        .route("/{id}/availability", get(rooms::availability))
}

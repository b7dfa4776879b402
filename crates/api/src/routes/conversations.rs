//! Route definitions for the `/conversations` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::conversations;
use crate::state::AppState;

/// Routes mounted at `/conversations`.
///
/// ```text
/// GET    /                  -> list_conversations
/// POST   /                  -> start_conversation
/// GET    /{id}/messages     -> list_messages
/// POST   /{id}/messages     -> send_message
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(conversations::list_conversations).post(conversations::start_conversation),
        )
        .route(
            "/{id}/messages",
            get(conversations::list_messages).post(conversations::send_message),
        )
}

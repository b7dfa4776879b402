pub mod auth;
pub mod bookings;
pub mod conversations;
pub mod health;
pub mod notifications;
pub mod payments;
pub mod promotions;
pub mod rooms;
pub mod studios;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register, /auth/login, /auth/refresh       public
/// /auth/logout, /auth/me                           authenticated
///
/// /studios                                         catalog (public), create
/// /studios/mine                                    owner's studios
/// /studios/{id}                                    detail, update, delete
/// /studios/{id}/rooms                              list, create
/// /studios/{id}/reviews                            list (public)
/// /studios/{id}/promotions                         history, buy
///
/// /rooms/{id}                                      get, update, deactivate
/// /rooms/{id}/availability                         busy slots for a day
///
/// /bookings                                        create, list own
/// /bookings/owner                                  bookings of owned studios
/// /bookings/{id}                                   detail
/// /bookings/{id}/cancel|complete|pay|review        lifecycle actions
///
/// /payments/webhook                                gateway notifications
/// /payments/{id}                                   payment status
///
/// /conversations                                   inbox, start
/// /conversations/{id}/messages                     list, send
///
/// /notifications                                   list
/// /notifications/unread-count                      count
/// /notifications/read-all                          mark all read
/// /notifications/{id}/read                         mark one read
///
/// /promotions/plans                                plan catalogue (public)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/studios", studios::router())
        .nest("/rooms", rooms::router())
        .nest("/bookings", bookings::router())
        .nest("/payments", payments::router())
        .nest("/conversations", conversations::router())
        .nest("/notifications", notifications::router())
        .nest("/promotions", promotions::router())
}

//! User-facing text for events: notification titles, bodies and links.
//!
//! Shared by in-app notifications and email so both say the same thing.

use crate::bus::{
    PlatformEvent, BOOKING_CANCELLED, BOOKING_COMPLETED, BOOKING_CONFIRMED, BOOKING_CREATED,
    MESSAGE_SENT, PAYMENT_SUCCEEDED, PROMOTION_ACTIVATED, REVIEW_CREATED,
};

/// Rendered notification for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

/// Events that are also sent by email when SMTP is configured.
pub fn is_emailed(event_type: &str) -> bool {
    matches!(
        event_type,
        BOOKING_CONFIRMED | BOOKING_CANCELLED | MESSAGE_SENT | REVIEW_CREATED
    )
}

/// Render the notification for an event, or `None` for events that do not
/// notify anyone.
pub fn render(event: &PlatformEvent) -> Option<NotificationContent> {
    let studio = event.payload_str("studio_name");
    let room = event.payload_str("room_name");
    let starts_at = event.payload_str("starts_at");
    let id = event.source_entity_id;

    let (title, body, link) = match event.event_type.as_str() {
        BOOKING_CREATED => (
            "New booking request".to_string(),
            format!("{room} at {studio} was requested for {starts_at}. It is held until paid."),
            id.map(|id| format!("/bookings/{id}")),
        ),
        BOOKING_CONFIRMED => (
            "Booking confirmed".to_string(),
            format!("Your booking of {room} at {studio} on {starts_at} is confirmed."),
            id.map(|id| format!("/bookings/{id}")),
        ),
        BOOKING_CANCELLED => {
            let reason = event.payload_str("reason");
            let body = if reason.is_empty() {
                format!("The booking of {room} at {studio} on {starts_at} was cancelled.")
            } else {
                format!(
                    "The booking of {room} at {studio} on {starts_at} was cancelled: {reason}"
                )
            };
            ("Booking cancelled".to_string(), body, id.map(|id| format!("/bookings/{id}")))
        }
        BOOKING_COMPLETED => (
            "How was your session?".to_string(),
            format!("Your session at {studio} is over. Leave a review to help other clients."),
            id.map(|id| format!("/bookings/{id}")),
        ),
        PAYMENT_SUCCEEDED => (
            "Payment received".to_string(),
            format!("Payment of {} RUB was received.", event.payload_str("amount")),
            None,
        ),
        MESSAGE_SENT => (
            format!("New message about {studio}"),
            event.payload_str("preview").to_string(),
            id.map(|id| format!("/conversations/{id}")),
        ),
        REVIEW_CREATED => {
            let rating = event
                .payload
                .get("rating")
                .and_then(|v| v.as_i64())
                .unwrap_or_default();
            (
                "New review".to_string(),
                format!("{studio} received a {rating}-star review."),
                event
                    .payload
                    .get("studio_id")
                    .and_then(|v| v.as_i64())
                    .map(|sid| format!("/studios/{sid}")),
            )
        }
        PROMOTION_ACTIVATED => (
            "Promotion active".to_string(),
            format!(
                "{studio} is promoted until {}.",
                event.payload_str("ends_at")
            ),
            event
                .payload
                .get("studio_id")
                .and_then(|v| v.as_i64())
                .map(|sid| format!("/studios/{sid}/promotions")),
        ),
        _ => return None,
    };

    Some(NotificationContent {
        kind: event.event_type.clone(),
        title,
        body,
        link,
    })
}

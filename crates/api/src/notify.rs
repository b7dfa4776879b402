//! Builders for the platform events published by handlers and jobs.
//!
//! Each builder fills in the recipients and the payload keys the
//! notification templates read.

use studiora_core::payment::format_amount;
use studiora_core::types::{DbId, Timestamp};
use studiora_db::models::booking::BookingDetail;
use studiora_db::models::conversation::{Conversation, Message};
use studiora_db::models::payment::Payment;
use studiora_db::models::promotion::Promotion;
use studiora_events::bus::{MESSAGE_SENT, PAYMENT_SUCCEEDED, PROMOTION_ACTIVATED, REVIEW_CREATED};
use studiora_events::PlatformEvent;

fn display_time(ts: Timestamp) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Booking lifecycle event addressed to both the client and the studio owner.
pub fn booking_event(event_type: &str, booking: &BookingDetail) -> PlatformEvent {
    PlatformEvent::new(event_type)
        .with_source("booking", booking.id)
        .with_recipient(booking.client_id)
        .with_recipient(booking.owner_id)
        .with_payload(serde_json::json!({
            "studio_id": booking.studio_id,
            "studio_name": booking.studio_name,
            "room_name": booking.room_name,
            "starts_at": display_time(booking.starts_at),
            "total_price": format_amount(booking.total_price),
            "reason": booking.cancel_reason,
        }))
}

/// Receipt for the payer of a successful charge.
pub fn payment_event(payment: &Payment) -> PlatformEvent {
    PlatformEvent::new(PAYMENT_SUCCEEDED)
        .with_source("payment", payment.id)
        .with_recipient(payment.payer_id)
        .with_payload(serde_json::json!({
            "amount": format_amount(payment.amount),
            "purpose": payment.purpose,
        }))
}

/// Characters of a message quoted in its notification.
const PREVIEW_CHARS: usize = 120;

/// New-message notice for the other participant of a conversation.
pub fn message_event(
    conversation: &Conversation,
    message: &Message,
    studio_name: &str,
) -> PlatformEvent {
    let mut preview: String = message.body.chars().take(PREVIEW_CHARS).collect();
    if message.body.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    PlatformEvent::new(MESSAGE_SENT)
        .with_source("conversation", conversation.id)
        .with_actor(message.sender_id)
        .with_recipient(conversation.counterpart(message.sender_id))
        .with_payload(serde_json::json!({
            "studio_id": conversation.studio_id,
            "studio_name": studio_name,
            "preview": preview,
        }))
}

pub fn review_event(
    review_id: DbId,
    author_id: DbId,
    owner_id: DbId,
    studio_id: DbId,
    studio_name: &str,
    rating: i16,
) -> PlatformEvent {
    PlatformEvent::new(REVIEW_CREATED)
        .with_source("review", review_id)
        .with_actor(author_id)
        .with_recipient(owner_id)
        .with_payload(serde_json::json!({
            "studio_id": studio_id,
            "studio_name": studio_name,
            "rating": rating,
        }))
}

pub fn promotion_event(promotion: &Promotion, owner_id: DbId, studio_name: &str) -> PlatformEvent {
    PlatformEvent::new(PROMOTION_ACTIVATED)
        .with_source("promotion", promotion.id)
        .with_recipient(owner_id)
        .with_payload(serde_json::json!({
            "studio_id": promotion.studio_id,
            "studio_name": studio_name,
            "plan": promotion.plan_code,
            "ends_at": display_time(promotion.ends_at),
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use studiora_events::bus::BOOKING_CANCELLED;

    fn detail() -> BookingDetail {
        let start = chrono::Utc.with_ymd_and_hms(2030, 3, 4, 10, 0, 0).unwrap();
        BookingDetail {
            id: 12,
            room_id: 3,
            client_id: 100,
            starts_at: start,
            ends_at: start + chrono::Duration::hours(2),
            status: "cancelled".into(),
            total_price: 450_000,
            comment: None,
            cancel_reason: Some("Owner is ill".into()),
            payment_id: None,
            created_at: start,
            room_name: "Cyclorama".into(),
            studio_id: 9,
            studio_name: "North Light".into(),
            owner_id: 200,
        }
    }

    #[test]
    fn booking_event_targets_both_parties() {
        let event = booking_event(BOOKING_CANCELLED, &detail());
        assert_eq!(event.recipient_ids, vec![100, 200]);
        assert_eq!(event.source_entity_id, Some(12));
        assert_eq!(event.payload_str("starts_at"), "2030-03-04 10:00 UTC");
        assert_eq!(event.payload_str("reason"), "Owner is ill");
        assert_eq!(event.payload_str("total_price"), "4500.00");
    }

    #[test]
    fn message_event_truncates_preview() {
        let now = chrono::Utc::now();
        let conversation = Conversation {
            id: 4,
            studio_id: 9,
            client_id: 100,
            owner_id: 200,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        };
        let message = Message {
            id: 1,
            conversation_id: 4,
            sender_id: 100,
            body: "a".repeat(300),
            is_read: false,
            read_at: None,
            created_at: now,
        };
        let event = message_event(&conversation, &message, "North Light");
        assert_eq!(event.recipient_ids, vec![200]);
        assert_eq!(event.payload_str("preview").len(), PREVIEW_CHARS + 3);
        assert!(event.payload_str("preview").ends_with("..."));
    }

    #[test]
    fn review_event_skips_author() {
        let event = review_event(1, 100, 200, 9, "North Light", 5);
        assert_eq!(event.actor_user_id, Some(100));
        assert_eq!(event.recipient_ids, vec![200]);
    }
}

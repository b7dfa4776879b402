//! Inbound gateway notifications.
//!
//! The body is only used to learn *which* payment changed. Its status is
//! never trusted: the handler re-fetches the payment from the gateway.

use serde::Deserialize;
use studiora_core::payment::PaymentStatus;

use crate::error::PaymentError;

/// Notification events the platform reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentWaitingForCapture,
    PaymentSucceeded,
    PaymentCanceled,
    RefundSucceeded,
    /// Any other event; acknowledged and ignored.
    Other(String),
}

impl WebhookEvent {
    pub fn parse(event: &str) -> Self {
        match event {
            "payment.waiting_for_capture" => Self::PaymentWaitingForCapture,
            "payment.succeeded" => Self::PaymentSucceeded,
            "payment.canceled" => Self::PaymentCanceled,
            "refund.succeeded" => Self::RefundSucceeded,
            other => Self::Other(other.to_string()),
        }
    }

    /// The payment status this event claims.
    pub fn implied_status(&self) -> Option<PaymentStatus> {
        match self {
            Self::PaymentWaitingForCapture => Some(PaymentStatus::WaitingForCapture),
            Self::PaymentSucceeded => Some(PaymentStatus::Succeeded),
            Self::PaymentCanceled => Some(PaymentStatus::Canceled),
            Self::RefundSucceeded => Some(PaymentStatus::Refunded),
            Self::Other(_) => None,
        }
    }
}

/// Notification body: `{ "type": "notification", "event": ..., "object": {...} }`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookNotification {
    #[serde(rename = "type")]
    pub kind: String,
    pub event: String,
    pub object: serde_json::Value,
}

impl WebhookNotification {
    pub fn from_slice(body: &[u8]) -> Result<Self, PaymentError> {
        serde_json::from_slice(body).map_err(|e| PaymentError::Decode(e.to_string()))
    }

    pub fn event(&self) -> WebhookEvent {
        WebhookEvent::parse(&self.event)
    }

    /// Gateway id of the payment concerned.
    ///
    /// Payment events carry a payment object (`object.id`); refund events
    /// carry a refund object pointing at its payment (`object.payment_id`).
    pub fn gateway_payment_id(&self) -> Result<&str, PaymentError> {
        let field = match self.event() {
            WebhookEvent::RefundSucceeded => "payment_id",
            _ => "id",
        };
        self.object
            .get(field)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PaymentError::Decode(format!("notification object has no '{field}'")))
    }
}

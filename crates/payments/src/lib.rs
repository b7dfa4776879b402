//! Payment gateway integration.
//!
//! - [`gateway`] -- the [`PaymentGateway`] trait the API layer depends on.
//! - [`yookassa`] -- REST client for the YooKassa v3 API.
//! - [`webhook`] -- inbound notification payloads.

pub mod error;
pub mod gateway;
pub mod webhook;
pub mod yookassa;

pub use error::PaymentError;
pub use gateway::{CreatePaymentRequest, GatewayPayment, GatewayRefund, PaymentGateway};
pub use webhook::{WebhookEvent, WebhookNotification};
pub use yookassa::{YooKassaClient, YooKassaConfig};

//! Gateway abstraction.
//!
//! Handlers hold an `Arc<dyn PaymentGateway>` so tests can substitute a
//! recording mock for the real HTTP client.

use std::collections::HashMap;

use async_trait::async_trait;
use studiora_core::payment::PaymentStatus;
use studiora_core::types::{DbId, MinorUnits};

use crate::error::PaymentError;

/// Metadata key carrying the local payment id.
pub const METADATA_PAYMENT_ID: &str = "payment_id";
/// Metadata key carrying the payment purpose (`booking` / `promotion`).
pub const METADATA_PURPOSE: &str = "purpose";

/// A payment to be created at the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePaymentRequest {
    /// Local `payments.id`, echoed back in metadata.
    pub payment_id: DbId,
    pub purpose: String,
    pub amount: MinorUnits,
    pub currency: String,
    pub description: String,
    /// Where the payer lands after the hosted payment page.
    pub return_url: String,
}

/// A payment as the gateway reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPayment {
    pub id: String,
    pub status: PaymentStatus,
    pub amount: MinorUnits,
    pub currency: String,
    pub paid: bool,
    pub confirmation_url: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl GatewayPayment {
    /// Local payment id from metadata, if present and numeric.
    pub fn local_payment_id(&self) -> Option<DbId> {
        self.metadata
            .get(METADATA_PAYMENT_ID)
            .and_then(|v| v.parse().ok())
    }
}

/// A refund as the gateway reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRefund {
    pub id: String,
    pub payment_id: String,
    pub status: String,
    pub amount: MinorUnits,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment and return it with its confirmation URL.
    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<GatewayPayment, PaymentError>;

    /// Fetch the current state of a payment.
    async fn get_payment(&self, id: &str) -> Result<GatewayPayment, PaymentError>;

    /// Cancel a payment that has not been captured.
    async fn cancel_payment(&self, id: &str) -> Result<GatewayPayment, PaymentError>;

    /// Refund `amount` of a succeeded payment.
    async fn create_refund(
        &self,
        payment_id: &str,
        amount: MinorUnits,
        currency: &str,
    ) -> Result<GatewayRefund, PaymentError>;
}

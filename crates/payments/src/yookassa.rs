//! REST client for the YooKassa v3 API.
//!
//! Requests are authenticated with HTTP Basic auth (shop id / secret key).
//! Every mutating request carries an `Idempotence-Key` derived from what it
//! acts on: the local payment id for checkouts, the gateway payment id for
//! cancels and refunds. Retrying the same operation reuses the key, so the
//! gateway answers with the original result instead of charging or
//! refunding twice.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use studiora_core::payment::{format_amount, parse_amount, PaymentStatus};
use studiora_core::types::{DbId, MinorUnits};

use crate::error::PaymentError;
use crate::gateway::{
    CreatePaymentRequest, GatewayPayment, GatewayRefund, PaymentGateway, METADATA_PAYMENT_ID,
    METADATA_PURPOSE,
};

const DEFAULT_API_URL: &str = "https://api.yookassa.ru/v3";
const IDEMPOTENCE_HEADER: &str = "Idempotence-Key";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct YooKassaConfig {
    pub shop_id: String,
    pub secret_key: String,
    pub api_url: String,
}

impl YooKassaConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `YOOKASSA_SHOP_ID` or `YOOKASSA_SECRET_KEY` is not
    /// set, in which case online payments are disabled.
    ///
    /// | Variable              | Required | Default                        |
    /// |-----------------------|----------|--------------------------------|
    /// | `YOOKASSA_SHOP_ID`    | yes      | --                             |
    /// | `YOOKASSA_SECRET_KEY` | yes      | --                             |
    /// | `YOOKASSA_API_URL`    | no       | `https://api.yookassa.ru/v3`   |
    pub fn from_env() -> Option<Self> {
        let shop_id = std::env::var("YOOKASSA_SHOP_ID").ok()?;
        let secret_key = std::env::var("YOOKASSA_SECRET_KEY").ok()?;
        Some(Self {
            shop_id,
            secret_key,
            api_url: std::env::var("YOOKASSA_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
struct Amount {
    value: String,
    currency: String,
}

#[derive(Debug, Serialize)]
struct Confirmation<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    return_url: &'a str,
}

#[derive(Debug, Serialize)]
struct CreatePaymentBody<'a> {
    amount: Amount,
    capture: bool,
    confirmation: Confirmation<'a>,
    description: &'a str,
    metadata: HashMap<&'static str, String>,
}

#[derive(Debug, Serialize)]
struct CreateRefundBody<'a> {
    payment_id: &'a str,
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct ConfirmationObject {
    confirmation_url: Option<String>,
}

/// Payment object as returned by the API and embedded in notifications.
#[derive(Debug, Deserialize)]
pub(crate) struct PaymentObject {
    id: String,
    status: String,
    amount: Amount,
    #[serde(default)]
    paid: bool,
    confirmation: Option<ConfirmationObject>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RefundObject {
    id: String,
    payment_id: String,
    status: String,
    amount: Amount,
}

/// Description shown to the payer is capped by the gateway at 128 chars.
const MAX_DESCRIPTION_CHARS: usize = 128;

fn create_payment_body(request: &CreatePaymentRequest) -> CreatePaymentBody<'_> {
    let description = match request.description.char_indices().nth(MAX_DESCRIPTION_CHARS) {
        Some((idx, _)) => &request.description[..idx],
        None => request.description.as_str(),
    };
    let mut metadata = HashMap::new();
    metadata.insert(METADATA_PAYMENT_ID, request.payment_id.to_string());
    metadata.insert(METADATA_PURPOSE, request.purpose.clone());

    CreatePaymentBody {
        amount: Amount {
            value: format_amount(request.amount),
            currency: request.currency.clone(),
        },
        capture: true,
        confirmation: Confirmation {
            kind: "redirect",
            return_url: &request.return_url,
        },
        description,
        metadata,
    }
}

impl TryFrom<PaymentObject> for GatewayPayment {
    type Error = PaymentError;

    fn try_from(object: PaymentObject) -> Result<Self, Self::Error> {
        let status: PaymentStatus = object
            .status
            .parse()
            .map_err(|_| PaymentError::Decode(format!("unknown payment status '{}'", object.status)))?;
        let amount = parse_amount(&object.amount.value)
            .map_err(|e| PaymentError::Decode(e.to_string()))?;
        Ok(Self {
            id: object.id,
            status,
            amount,
            currency: object.amount.currency,
            paid: object.paid,
            confirmation_url: object.confirmation.and_then(|c| c.confirmation_url),
            metadata: object.metadata,
        })
    }
}

impl TryFrom<RefundObject> for GatewayRefund {
    type Error = PaymentError;

    fn try_from(object: RefundObject) -> Result<Self, Self::Error> {
        let amount = parse_amount(&object.amount.value)
            .map_err(|e| PaymentError::Decode(e.to_string()))?;
        Ok(Self {
            id: object.id,
            payment_id: object.payment_id,
            status: object.status,
            amount,
        })
    }
}

// ---------------------------------------------------------------------------
// Idempotence keys
// ---------------------------------------------------------------------------

fn checkout_key(payment_id: DbId) -> String {
    format!("checkout-{payment_id}")
}

fn cancel_key(gateway_payment_id: &str) -> String {
    format!("cancel-{gateway_payment_id}")
}

/// The amount is part of the key: a later partial refund of the same
/// payment is a different operation.
fn refund_key(gateway_payment_id: &str, amount: MinorUnits) -> String {
    format!("refund-{gateway_payment_id}-{amount}")
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for a YooKassa shop.
pub struct YooKassaClient {
    client: reqwest::Client,
    config: YooKassaConfig,
}

impl YooKassaClient {
    pub fn new(config: YooKassaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str, idempotence_key: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
            .header(IDEMPOTENCE_HEADER, idempotence_key)
    }

    /// Ensure the response has a success status code and decode its body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PaymentError::Api {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| PaymentError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for YooKassaClient {
    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<GatewayPayment, PaymentError> {
        let response = self
            .post("/payments", &checkout_key(request.payment_id))
            .json(&create_payment_body(request))
            .send()
            .await?;
        let object: PaymentObject = Self::parse_response(response).await?;
        tracing::info!(
            payment_id = request.payment_id,
            gateway_payment_id = %object.id,
            "Gateway payment created",
        );
        object.try_into()
    }

    async fn get_payment(&self, id: &str) -> Result<GatewayPayment, PaymentError> {
        let response = self
            .client
            .get(self.url(&format!("/payments/{id}")))
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
            .send()
            .await?;
        let object: PaymentObject = Self::parse_response(response).await?;
        object.try_into()
    }

    async fn cancel_payment(&self, id: &str) -> Result<GatewayPayment, PaymentError> {
        let response = self
            .post(&format!("/payments/{id}/cancel"), &cancel_key(id))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let object: PaymentObject = Self::parse_response(response).await?;
        object.try_into()
    }

    async fn create_refund(
        &self,
        payment_id: &str,
        amount: MinorUnits,
        currency: &str,
    ) -> Result<GatewayRefund, PaymentError> {
        let body = CreateRefundBody {
            payment_id,
            amount: Amount {
                value: format_amount(amount),
                currency: currency.to_string(),
            },
        };
        let response = self
            .post("/refunds", &refund_key(payment_id, amount))
            .json(&body)
            .send()
            .await?;
        let object: RefundObject = Self::parse_response(response).await?;
        tracing::info!(gateway_payment_id = payment_id, refund_id = %object.id, "Refund created");
        object.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn request() -> CreatePaymentRequest {
        CreatePaymentRequest {
            payment_id: 7,
            purpose: "booking".into(),
            amount: 150_050,
            currency: "RUB".into(),
            description: "Booking #12".into(),
            return_url: "https://studiora.example/bookings/12".into(),
        }
    }

    #[test]
    fn payment_body_matches_wire_format() {
        let req = request();
        let body = serde_json::to_value(create_payment_body(&req)).unwrap();
        assert_eq!(body["amount"]["value"], "1500.50");
        assert_eq!(body["amount"]["currency"], "RUB");
        assert_eq!(body["capture"], true);
        assert_eq!(body["confirmation"]["type"], "redirect");
        assert_eq!(body["confirmation"]["return_url"], req.return_url);
        assert_eq!(body["metadata"]["payment_id"], "7");
        assert_eq!(body["metadata"]["purpose"], "booking");
    }

    #[test]
    fn long_description_is_truncated() {
        let mut req = request();
        req.description = "я".repeat(200);
        let body = create_payment_body(&req);
        assert_eq!(body.description.chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn payment_object_decodes() {
        let object: PaymentObject = serde_json::from_value(serde_json::json!({
            "id": "2d0d1b4e-000f-5000-8000-1b2c3d4e5f60",
            "status": "pending",
            "paid": false,
            "amount": { "value": "1500.50", "currency": "RUB" },
            "confirmation": {
                "type": "redirect",
                "confirmation_url": "https://yoomoney.ru/checkout/payments/v2/contract?orderId=2d0d"
            },
            "created_at": "2030-01-01T00:00:00.000Z",
            "metadata": { "payment_id": "7", "purpose": "booking" },
            "test": true
        }))
        .unwrap();

        let payment = GatewayPayment::try_from(object).unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, 150_050);
        assert_eq!(payment.local_payment_id(), Some(7));
        assert!(payment.confirmation_url.unwrap().contains("orderId"));
    }

    #[test]
    fn unknown_status_is_a_decode_error() {
        let object: PaymentObject = serde_json::from_value(serde_json::json!({
            "id": "x",
            "status": "exploded",
            "amount": { "value": "1.00", "currency": "RUB" }
        }))
        .unwrap();
        assert_matches!(GatewayPayment::try_from(object), Err(PaymentError::Decode(_)));
    }

    #[test]
    fn url_joins_without_double_slash() {
        let client = YooKassaClient::new(YooKassaConfig {
            shop_id: "1".into(),
            secret_key: "k".into(),
            api_url: "https://api.yookassa.ru/v3/".into(),
        });
        assert_eq!(client.url("/payments"), "https://api.yookassa.ru/v3/payments");
    }

    #[test]
    fn retried_operations_reuse_their_idempotence_key() {
        assert_eq!(checkout_key(7), checkout_key(7));
        assert_ne!(checkout_key(7), checkout_key(8));
        assert_eq!(refund_key("2d0d", 500), refund_key("2d0d", 500));
        assert_ne!(refund_key("2d0d", 500), refund_key("2d0d", 250));
        assert_ne!(cancel_key("2d0d"), refund_key("2d0d", 500));
    }

    #[test]
    fn mutating_requests_carry_the_idempotence_key() {
        let client = YooKassaClient::new(YooKassaConfig {
            shop_id: "1".into(),
            secret_key: "k".into(),
            api_url: "https://api.yookassa.ru/v3".into(),
        });
        let request = client
            .post("/refunds", &refund_key("2d0d", 500))
            .build()
            .unwrap();
        assert_eq!(request.headers()[IDEMPOTENCE_HEADER], "refund-2d0d-500");
    }
}

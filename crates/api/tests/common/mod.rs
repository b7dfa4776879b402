//! Shared harness for the HTTP integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{DurationRound, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use studiora_api::auth::jwt::JwtConfig;
use studiora_api::cache::Cache;
use studiora_api::config::{BookingConfig, RateLimitConfig, ServerConfig};
use studiora_api::rate_limit::RateLimiter;
use studiora_api::router::build_app_router;
use studiora_api::state::AppState;
use studiora_core::payment::PaymentStatus;
use studiora_core::types::{MinorUnits, Timestamp};
use studiora_events::EventBus;
use studiora_payments::{
    CreatePaymentRequest, GatewayPayment, GatewayRefund, PaymentError, PaymentGateway,
};

pub const TEST_PASSWORD: &str = "correct horse 42";

// ---------------------------------------------------------------------------
// Config and app
// ---------------------------------------------------------------------------

/// Test configuration with limits high enough that no test trips them
/// unless it means to.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 30,
        },
        rate_limit: RateLimitConfig {
            max_requests: 10_000,
            auth_max_requests: 10_000,
            window_secs: 60,
        },
        booking: BookingConfig {
            payment_timeout_mins: 30,
            public_base_url: "http://localhost:5173".to_string(),
        },
        cache_ttl_secs: 60,
        redis_url: None,
    }
}

pub struct TestApp {
    pub router: Router,
    pub gateway: Option<Arc<MockGateway>>,
    pub event_bus: Arc<EventBus>,
}

impl TestApp {
    /// A fresh handle to the router; each request consumes one.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    pub fn gateway(&self) -> &MockGateway {
        self.gateway
            .as_deref()
            .expect("test app was built without a gateway")
    }
}

fn build(pool: PgPool, config: ServerConfig, gateway: Option<Arc<MockGateway>>) -> TestApp {
    let event_bus = Arc::new(EventBus::default());
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        payments: gateway
            .clone()
            .map(|g| g as Arc<dyn PaymentGateway>),
        cache: Arc::new(Cache::memory(Duration::from_secs(config.cache_ttl_secs))),
        rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
    };
    TestApp {
        router: build_app_router(state, &config),
        gateway,
        event_bus,
    }
}

/// Full router without a payment gateway.
pub fn build_test_app(pool: PgPool) -> Router {
    build(pool, test_config(), None).router
}

/// Full router wired to a [`MockGateway`].
pub fn build_test_app_with_gateway(pool: PgPool) -> TestApp {
    build(pool, test_config(), Some(Arc::new(MockGateway::default())))
}

pub fn build_test_app_with_config(pool: PgPool, config: ServerConfig) -> Router {
    build(pool, config, None).router
}

// ---------------------------------------------------------------------------
// Mock payment gateway
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockState {
    next_id: u32,
    payments: HashMap<String, GatewayPayment>,
    refunds: Vec<(String, MinorUnits)>,
    cancelled: Vec<String>,
    fail_create: bool,
}

/// In-memory gateway. Payments start `pending`; tests move them with
/// [`MockGateway::set_status`] before posting a webhook.
#[derive(Debug, Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn set_status(&self, gateway_id: &str, status: PaymentStatus) {
        let mut state = self.state.lock().unwrap();
        let payment = state
            .payments
            .get_mut(gateway_id)
            .expect("unknown gateway payment");
        payment.status = status;
        payment.paid = matches!(status, PaymentStatus::Succeeded);
    }

    pub fn fail_next_create(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    pub fn created_count(&self) -> usize {
        self.state.lock().unwrap().payments.len()
    }

    pub fn refunds(&self) -> Vec<(String, MinorUnits)> {
        self.state.lock().unwrap().refunds.clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<GatewayPayment, PaymentError> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail_create) {
            return Err(PaymentError::Api {
                status: 500,
                body: "internal gateway error".into(),
            });
        }
        state.next_id += 1;
        let id = format!("mock-{}", state.next_id);
        let payment = GatewayPayment {
            id: id.clone(),
            status: PaymentStatus::Pending,
            amount: request.amount,
            currency: request.currency.clone(),
            paid: false,
            confirmation_url: Some(format!("https://pay.example.test/{id}")),
            metadata: HashMap::from([
                ("payment_id".to_string(), request.payment_id.to_string()),
                ("purpose".to_string(), request.purpose.clone()),
            ]),
        };
        state.payments.insert(id, payment.clone());
        Ok(payment)
    }

    async fn get_payment(&self, id: &str) -> Result<GatewayPayment, PaymentError> {
        self.state
            .lock()
            .unwrap()
            .payments
            .get(id)
            .cloned()
            .ok_or_else(|| PaymentError::Api {
                status: 404,
                body: "not found".into(),
            })
    }

    async fn cancel_payment(&self, id: &str) -> Result<GatewayPayment, PaymentError> {
        let mut state = self.state.lock().unwrap();
        state.cancelled.push(id.to_string());
        let payment = state.payments.get_mut(id).ok_or_else(|| PaymentError::Api {
            status: 404,
            body: "not found".into(),
        })?;
        payment.status = PaymentStatus::Canceled;
        Ok(payment.clone())
    }

    async fn create_refund(
        &self,
        payment_id: &str,
        amount: MinorUnits,
        _currency: &str,
    ) -> Result<GatewayRefund, PaymentError> {
        let mut state = self.state.lock().unwrap();
        state.refunds.push((payment_id.to_string(), amount));
        Ok(GatewayRefund {
            id: format!("refund-{}", state.refunds.len()),
            payment_id: payment_id.to_string(),
            status: "succeeded".to_string(),
            amount,
        })
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A registered user: id and access token.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub token: String,
    pub refresh_token: String,
}

pub async fn register(app: Router, email: &str, role: &str) -> TestUser {
    let response = post_json(
        app,
        "/api/v1/auth/register",
        json!({
            "email": email,
            "name": format!("User {email}"),
            "password": TEST_PASSWORD,
            "role": role,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED, "registration failed");
    let json = body_json(response).await;
    TestUser {
        id: json["user"]["id"].as_i64().unwrap(),
        token: json["access_token"].as_str().unwrap().to_string(),
        refresh_token: json["refresh_token"].as_str().unwrap().to_string(),
    }
}

/// Create a studio with one room through the API; returns `(studio_id, room_id)`.
pub async fn studio_with_room(app: Router, owner: &TestUser, city: &str, hourly_price: i64) -> (i64, i64) {
    let response = post_json_auth(
        app.clone(),
        "/api/v1/studios",
        json!({
            "name": format!("Studio in {city}"),
            "city": city,
            "address": "5 Light street",
        }),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED, "studio creation failed");
    let studio_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = post_json_auth(
        app,
        &format!("/api/v1/studios/{studio_id}/rooms"),
        json!({
            "name": "Cyclorama",
            "capacity": 10,
            "hourly_price": hourly_price,
        }),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED, "room creation failed");
    let room_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    (studio_id, room_id)
}

/// A whole hour `days` days from now.
pub fn slot_start(days: i64) -> Timestamp {
    (Utc::now() + chrono::Duration::days(days))
        .duration_trunc(chrono::Duration::hours(1))
        .unwrap()
}

pub async fn book(app: Router, client: &TestUser, room_id: i64, start: Timestamp, hours: i64) -> Response {
    post_json_auth(
        app,
        "/api/v1/bookings",
        json!({
            "room_id": room_id,
            "starts_at": start,
            "ends_at": start + chrono::Duration::hours(hours),
        }),
        &client.token,
    )
    .await
}

/// Body of a gateway notification for `gateway_id`.
pub fn notification(event: &str, gateway_id: &str) -> Value {
    json!({
        "type": "notification",
        "event": event,
        "object": { "id": gateway_id, "status": "ignored-by-server" },
    })
}

//! Handlers for paid studio promotions.
//!
//! Buying a plan creates an unpaid promotion and a gateway checkout. The
//! promotion only starts affecting catalog ranking once the payment webhook
//! marks it paid.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use studiora_core::payment::{PaymentPurpose, PaymentStatus, CURRENCY};
use studiora_core::promotion::{
    is_active, plan_by_code, promotion_window, PromotionPlan, PLANS,
};
use studiora_core::types::DbId;
use studiora_db::models::payment::{CreatePayment, Payment};
use studiora_db::models::promotion::{CreatePromotion, Promotion, PurchasePromotion};
use studiora_db::repositories::{PaymentRepo, PromotionRepo};
use studiora_payments::CreatePaymentRequest;

use crate::error::AppResult;
use crate::handlers::studios::load_managed_studio;
use crate::middleware::rbac::RequireOwner;
use crate::response::DataResponse;
use crate::state::AppState;

/// A promotion with whether it currently affects ranking.
#[derive(Debug, Serialize)]
pub struct PromotionView {
    #[serde(flatten)]
    pub promotion: Promotion,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct PromotionCheckout {
    pub promotion: Promotion,
    pub payment: Payment,
    pub confirmation_url: Option<String>,
}

/// GET /api/v1/promotions/plans
pub async fn list_plans() -> Json<DataResponse<&'static [PromotionPlan]>> {
    Json(DataResponse { data: PLANS })
}

/// GET /api/v1/studios/{id}/promotions
pub async fn list_promotions(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
    Path(studio_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<PromotionView>>>> {
    load_managed_studio(&state, studio_id, &user).await?;
    let now = Utc::now();
    let promotions = PromotionRepo::list_by_studio(&state.pool, studio_id)
        .await?
        .into_iter()
        .map(|promotion| PromotionView {
            is_active: promotion.is_paid
                && is_active(promotion.starts_at, promotion.ends_at, now),
            promotion,
        })
        .collect();
    Ok(Json(DataResponse { data: promotions }))
}

/// POST /api/v1/studios/{id}/promotions
pub async fn buy_promotion(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
    Path(studio_id): Path<DbId>,
    Json(input): Json<PurchasePromotion>,
) -> AppResult<(StatusCode, Json<DataResponse<PromotionCheckout>>)> {
    let plan = plan_by_code(input.plan_code.trim())?;
    let studio = load_managed_studio(&state, studio_id, &user).await?;
    let gateway = state.gateway()?;

    // Provisional window; recomputed when the payment succeeds.
    let current_end = PromotionRepo::latest_paid_end(&state.pool, studio_id).await?;
    let (starts_at, ends_at) = promotion_window(plan, Utc::now(), current_end);

    let promotion = PromotionRepo::create(
        &state.pool,
        &CreatePromotion {
            studio_id,
            plan_code: plan.code.to_string(),
            boost: plan.boost,
            price: plan.price,
            starts_at,
            ends_at,
        },
    )
    .await?;

    let payment = PaymentRepo::create(
        &state.pool,
        &CreatePayment {
            purpose: PaymentPurpose::Promotion,
            booking_id: None,
            promotion_id: Some(promotion.id),
            payer_id: user.user_id,
            amount: plan.price,
            currency: CURRENCY.to_string(),
        },
    )
    .await?;

    let request = CreatePaymentRequest {
        payment_id: payment.id,
        purpose: PaymentPurpose::Promotion.as_str().to_string(),
        amount: payment.amount,
        currency: payment.currency.clone(),
        description: format!("{} promotion for {}", plan.title, studio.name),
        return_url: state
            .config
            .booking
            .return_url(&format!("/studios/{studio_id}/promotions")),
    };

    let gateway_payment = match gateway.create_payment(&request).await {
        Ok(p) => p,
        Err(e) => {
            PaymentRepo::update_status(
                &state.pool,
                payment.id,
                PaymentStatus::Pending,
                PaymentStatus::Canceled,
            )
            .await?;
            return Err(e.into());
        }
    };

    let payment = PaymentRepo::attach_gateway(
        &state.pool,
        payment.id,
        &gateway_payment.id,
        gateway_payment.confirmation_url.as_deref(),
    )
    .await?;

    tracing::info!(
        promotion_id = promotion.id,
        studio_id,
        plan = plan.code,
        payment_id = payment.id,
        "Promotion checkout started"
    );

    let confirmation_url = payment.confirmation_url.clone();
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: PromotionCheckout {
                promotion,
                payment,
                confirmation_url,
            },
        }),
    ))
}

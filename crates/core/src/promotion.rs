//! Promotion plans: paid, time-boxed ranking boosts for a studio.

use chrono::Duration;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::{MinorUnits, Timestamp};

/// A purchasable promotion plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PromotionPlan {
    pub code: &'static str,
    pub title: &'static str,
    pub duration_days: i64,
    pub price: MinorUnits,
    /// Ranking weight while active; higher sorts first.
    pub boost: i32,
}

pub const PLANS: &[PromotionPlan] = &[
    PromotionPlan {
        code: "basic",
        title: "Basic - 7 days",
        duration_days: 7,
        price: 99_000,
        boost: 1,
    },
    PromotionPlan {
        code: "standard",
        title: "Standard - 14 days",
        duration_days: 14,
        price: 179_000,
        boost: 2,
    },
    PromotionPlan {
        code: "premium",
        title: "Premium - 30 days",
        duration_days: 30,
        price: 349_000,
        boost: 3,
    },
];

pub fn plan_by_code(code: &str) -> Result<&'static PromotionPlan, CoreError> {
    PLANS.iter().find(|p| p.code == code).ok_or_else(|| {
        CoreError::Validation(format!(
            "Unknown promotion plan '{code}'. Must be one of: {}",
            PLANS.iter().map(|p| p.code).collect::<Vec<_>>().join(", ")
        ))
    })
}

/// Start and end of a newly purchased promotion.
///
/// If the studio already has a promotion running until `current_end`, the
/// new one is queued behind it instead of overlapping.
pub fn promotion_window(
    plan: &PromotionPlan,
    now: Timestamp,
    current_end: Option<Timestamp>,
) -> (Timestamp, Timestamp) {
    let starts_at = match current_end {
        Some(end) if end > now => end,
        _ => now,
    };
    (starts_at, starts_at + Duration::days(plan.duration_days))
}

/// Whether a paid promotion's window covers `now`.
pub fn is_active(starts_at: Timestamp, ends_at: Timestamp, now: Timestamp) -> bool {
    starts_at <= now && now < ends_at
}

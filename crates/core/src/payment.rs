//! Payment status model and gateway reconciliation rules.
//!
//! The payment gateway notifies us asynchronously and may deliver the same
//! notification more than once, or out of order. [`reconcile`] decides what a
//! reported status means for the locally stored one so webhook handling is
//! idempotent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::MinorUnits;

/// Currency used for all platform payments.
pub const CURRENCY: &str = "RUB";

/// Payment status as stored in `payments.status`. The text values match the
/// gateway's own status names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    WaitingForCapture,
    Succeeded,
    Canceled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::WaitingForCapture => "waiting_for_capture",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn is_final(self) -> bool {
        matches!(self, PaymentStatus::Canceled | PaymentStatus::Refunded)
    }

    /// Rank along the happy path, used to detect stale notifications.
    fn progress(self) -> u8 {
        match self {
            PaymentStatus::Pending => 0,
            PaymentStatus::WaitingForCapture => 1,
            PaymentStatus::Succeeded => 2,
            PaymentStatus::Canceled | PaymentStatus::Refunded => 3,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "waiting_for_capture" => Ok(PaymentStatus::WaitingForCapture),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "canceled" => Ok(PaymentStatus::Canceled),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(CoreError::Validation(format!(
                "Unknown payment status '{other}'"
            ))),
        }
    }
}

/// What a payment pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentPurpose {
    Booking,
    Promotion,
}

impl PaymentPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentPurpose::Booking => "booking",
            PaymentPurpose::Promotion => "promotion",
        }
    }
}

impl FromStr for PaymentPurpose {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booking" => Ok(PaymentPurpose::Booking),
            "promotion" => Ok(PaymentPurpose::Promotion),
            other => Err(CoreError::Validation(format!(
                "Unknown payment purpose '{other}'"
            ))),
        }
    }
}

/// Outcome of comparing a stored status with a gateway-reported one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Move the local payment to this status.
    Apply(PaymentStatus),
    /// Duplicate or stale notification; nothing to do.
    Ignore,
    /// The reported status contradicts what we already know.
    Reject,
}

pub fn reconcile(current: PaymentStatus, reported: PaymentStatus) -> Reconciliation {
    use PaymentStatus::*;

    if current == reported {
        return Reconciliation::Ignore;
    }
    match (current, reported) {
        (Canceled, _) | (Refunded, _) => Reconciliation::Reject,
        // Refunds only follow a successful charge.
        (Succeeded, Refunded) => Reconciliation::Apply(Refunded),
        (Succeeded, Canceled) => Reconciliation::Reject,
        (_, Refunded) => Reconciliation::Reject,
        (_, Canceled) => Reconciliation::Apply(Canceled),
        (c, r) if r.progress() > c.progress() => Reconciliation::Apply(r),
        _ => Reconciliation::Ignore,
    }
}

/// Format minor units as the gateway's decimal string, e.g. `150000 -> "1500.00"`.
pub fn format_amount(minor: MinorUnits) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Parse the gateway's decimal string back into minor units.
pub fn parse_amount(value: &str) -> Result<MinorUnits, CoreError> {
    let invalid = || CoreError::Validation(format!("Invalid amount '{value}'"));
    let (whole, frac) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, "0"),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || !digits(frac) || frac.len() > 2 {
        return Err(invalid());
    }
    let whole: i64 = whole.parse().map_err(|_| invalid())?;
    let mut frac_val: i64 = frac.parse().map_err(|_| invalid())?;
    if frac.len() == 1 {
        frac_val *= 10;
    }
    whole
        .checked_mul(100)
        .and_then(|minor| minor.checked_add(frac_val))
        .ok_or_else(invalid)
}

//! Repository for the `payments` and `payment_events` tables.

use sqlx::PgPool;
use studiora_core::payment::PaymentStatus;
use studiora_core::types::{DbId, MinorUnits};

use crate::models::payment::{CreatePayment, Payment, PaymentEvent};

const COLUMNS: &str = "id, purpose, booking_id, promotion_id, payer_id, amount, currency, status, \
                        gateway_payment_id, confirmation_url, paid_at, refunded_amount, \
                        created_at, updated_at";

/// Result of [`PaymentRepo::open_booking_checkout`].
#[derive(Debug)]
pub enum BookingCheckout {
    /// A new local payment the caller must register with the gateway.
    Started(Payment),
    /// An open checkout already registered with the gateway.
    Existing(Payment),
    /// Another request is registering a checkout right now.
    InProgress,
}

const EVENT_COLUMNS: &str = "id, payment_id, event, reported_status, applied, created_at";

/// Provides payment persistence and the webhook audit trail.
pub struct PaymentRepo;

impl PaymentRepo {
    /// Insert a local pending payment. The gateway id is attached afterwards.
    pub async fn create(pool: &PgPool, input: &CreatePayment) -> Result<Payment, sqlx::Error> {
        let query = format!(
            "INSERT INTO payments (purpose, booking_id, promotion_id, payer_id, amount, currency)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(input.purpose.as_str())
            .bind(input.booking_id)
            .bind(input.promotion_id)
            .bind(input.payer_id)
            .bind(input.amount)
            .bind(&input.currency)
            .fetch_one(pool)
            .await
    }

    /// Start a checkout for a booking unless one is already open.
    ///
    /// The booking row is locked `FOR UPDATE`, so concurrent checkouts of the
    /// same booking serialize and at most one payment is ever open for it.
    pub async fn open_booking_checkout(
        pool: &PgPool,
        input: &CreatePayment,
    ) -> Result<BookingCheckout, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(input.booking_id)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM payments
             WHERE booking_id = $1 AND status IN ('pending', 'waiting_for_capture')
             ORDER BY id DESC
             LIMIT 1"
        );
        let open = sqlx::query_as::<_, Payment>(&query)
            .bind(input.booking_id)
            .fetch_optional(&mut *tx)
            .await?;

        let outcome = match open {
            Some(payment) if payment.gateway_payment_id.is_some() => {
                BookingCheckout::Existing(payment)
            }
            Some(_) => BookingCheckout::InProgress,
            None => {
                let query = format!(
                    "INSERT INTO payments (purpose, booking_id, promotion_id, payer_id, amount, currency)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     RETURNING {COLUMNS}"
                );
                let payment = sqlx::query_as::<_, Payment>(&query)
                    .bind(input.purpose.as_str())
                    .bind(input.booking_id)
                    .bind(input.promotion_id)
                    .bind(input.payer_id)
                    .bind(input.amount)
                    .bind(&input.currency)
                    .fetch_one(&mut *tx)
                    .await?;
                BookingCheckout::Started(payment)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payments WHERE id = $1");
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_gateway_id(
        pool: &PgPool,
        gateway_payment_id: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payments WHERE gateway_payment_id = $1");
        sqlx::query_as::<_, Payment>(&query)
            .bind(gateway_payment_id)
            .fetch_optional(pool)
            .await
    }

    /// Latest payment attempt for a booking.
    pub async fn find_latest_for_booking(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM payments
             WHERE booking_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(booking_id)
            .fetch_optional(pool)
            .await
    }

    /// Store the gateway's payment id and the URL the payer is redirected to.
    pub async fn attach_gateway(
        pool: &PgPool,
        id: DbId,
        gateway_payment_id: &str,
        confirmation_url: Option<&str>,
    ) -> Result<Payment, sqlx::Error> {
        let query = format!(
            "UPDATE payments SET gateway_payment_id = $2, confirmation_url = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(gateway_payment_id)
            .bind(confirmation_url)
            .fetch_one(pool)
            .await
    }

    /// Move a payment from `from` to `to`.
    ///
    /// Guarded on the current status, so concurrent duplicate notifications
    /// apply at most once. `paid_at` is stamped on success.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "UPDATE payments SET
                status = $3,
                paid_at = CASE WHEN $3 = 'succeeded' THEN NOW() ELSE paid_at END
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Record a refund of `amount` against a succeeded payment.
    pub async fn record_refund(
        pool: &PgPool,
        id: DbId,
        amount: MinorUnits,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "UPDATE payments SET
                refunded_amount = refunded_amount + $2,
                status = CASE WHEN refunded_amount + $2 >= amount THEN 'refunded' ELSE status END
             WHERE id = $1 AND status = 'succeeded' AND refunded_amount + $2 <= amount
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(amount)
            .fetch_optional(pool)
            .await
    }

    /// Append a webhook notification to the audit trail.
    pub async fn record_event(
        pool: &PgPool,
        payment_id: DbId,
        event: &str,
        reported_status: PaymentStatus,
        applied: bool,
    ) -> Result<PaymentEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO payment_events (payment_id, event, reported_status, applied)
             VALUES ($1, $2, $3, $4)
             RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, PaymentEvent>(&query)
            .bind(payment_id)
            .bind(event)
            .bind(reported_status.as_str())
            .bind(applied)
            .fetch_one(pool)
            .await
    }

    pub async fn list_events(
        pool: &PgPool,
        payment_id: DbId,
    ) -> Result<Vec<PaymentEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM payment_events
             WHERE payment_id = $1
             ORDER BY id"
        );
        sqlx::query_as::<_, PaymentEvent>(&query)
            .bind(payment_id)
            .fetch_all(pool)
            .await
    }
}

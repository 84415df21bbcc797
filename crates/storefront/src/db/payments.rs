//! Payment records and order payment confirmation.
//!
//! Gateway callbacks can arrive more than once (client verify and webhook,
//! webhook retries). `razorpay_payment_id` is unique, so the first
//! confirmation inserts the payment and later ones are recognised as
//! replays inside the same transaction.

use rust_decimal::Decimal;
use sqlx::PgPool;

use wholesale_core::{OrderId, OrderStatus, PaymentRecordStatus, PaymentStatus};

use super::RepositoryError;
use super::orders::ORDER_COLUMNS;
use super::wallet;
use crate::models::{Order, Payment};

/// A gateway payment to record.
#[derive(Debug, Clone)]
pub struct NewPayment<'a> {
    pub razorpay_payment_id: &'a str,
    pub razorpay_order_id: Option<&'a str>,
    pub amount: Decimal,
    pub currency: &'a str,
    pub method: Option<&'a str>,
    pub error_description: Option<&'a str>,
    pub raw_event: Option<&'a serde_json::Value>,
}

/// Result of a confirmation attempt.
#[derive(Debug)]
pub enum ConfirmOutcome {
    /// First confirmation: the order is now paid. Run side effects.
    Confirmed(Order),
    /// Seen before, or the order was already paid. Nothing changed.
    Replay(Order),
    /// Money arrived for an order that had been cancelled. The payment is
    /// recorded and its amount credited to the buyer's wallet.
    RefundedToWallet(Order),
}

/// What a captured payment does to the order it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Replay,
    Refund,
    Confirm,
}

fn capture_action(inserted: bool, current: &Order) -> Capture {
    if !inserted || current.payment_status == PaymentStatus::Completed {
        Capture::Replay
    } else if current.status == OrderStatus::Cancelled {
        Capture::Refund
    } else {
        Capture::Confirm
    }
}

pub struct PaymentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a captured payment and mark the order paid, confirmed and
    /// invoiced, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn confirm(
        &self,
        order_id: OrderId,
        payment: &NewPayment<'_>,
    ) -> Result<ConfirmOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let inserted = sqlx::query(
            "INSERT INTO payments (order_id, razorpay_payment_id, razorpay_order_id, amount,
                                   currency, method, status, raw_event)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (razorpay_payment_id) DO NOTHING",
        )
        .bind(order_id)
        .bind(payment.razorpay_payment_id)
        .bind(payment.razorpay_order_id)
        .bind(payment.amount)
        .bind(payment.currency)
        .bind(payment.method)
        .bind(PaymentRecordStatus::Captured)
        .bind(payment.raw_event)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        match capture_action(inserted, &current) {
            Capture::Replay => {
                tx.commit().await?;
                return Ok(ConfirmOutcome::Replay(current));
            }
            Capture::Refund => {
                let reason = format!("Refund of payment for cancelled order {}", current.order_number);
                wallet::credit_in(&mut tx, current.user_id, payment.amount, &reason, Some(order_id))
                    .await?;
                let order = sqlx::query_as::<_, Order>(&format!(
                    "UPDATE orders SET payment_status = 'refunded', updated_at = NOW()
                     WHERE id = $1
                     RETURNING {ORDER_COLUMNS}"
                ))
                .bind(order_id)
                .fetch_one(&mut *tx)
                .await?;
                tx.commit().await?;
                return Ok(ConfirmOutcome::RefundedToWallet(order));
            }
            Capture::Confirm => {}
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET
                payment_status = 'completed',
                status = CASE WHEN status = 'pending' THEN 'confirmed'::order_status ELSE status END,
                razorpay_order_id = COALESCE(razorpay_order_id, $2),
                invoice_number = COALESCE(
                    invoice_number,
                    'INV-' || to_char(NOW(), 'YYYY') || '-'
                        || lpad(nextval('invoice_number_seq')::text, 6, '0')
                ),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(payment.razorpay_order_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ConfirmOutcome::Confirmed(order))
    }

    /// Record a failed attempt and mark the order's payment failed unless it
    /// has already been paid. Returns `false` for a replayed failure.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_failure(
        &self,
        order_id: OrderId,
        payment: &NewPayment<'_>,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO payments (order_id, razorpay_payment_id, razorpay_order_id, amount,
                                   currency, method, status, error_description, raw_event)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (razorpay_payment_id) DO NOTHING",
        )
        .bind(order_id)
        .bind(payment.razorpay_payment_id)
        .bind(payment.razorpay_order_id)
        .bind(payment.amount)
        .bind(payment.currency)
        .bind(payment.method)
        .bind(PaymentRecordStatus::Failed)
        .bind(payment.error_description)
        .bind(payment.raw_event)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if inserted {
            sqlx::query(
                "UPDATE orders SET payment_status = 'failed', updated_at = NOW()
                 WHERE id = $1 AND payment_status NOT IN ('completed', 'refunded')",
            )
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Payments recorded for an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, RepositoryError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT id, order_id, razorpay_payment_id, razorpay_order_id, amount, currency,
                    method, status, error_description, created_at
             FROM payments WHERE order_id = $1 ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(payments)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::tests::sample_order;

    fn unpaid_order() -> Order {
        let mut order = sample_order();
        order.status = OrderStatus::Pending;
        order.payment_status = PaymentStatus::Pending;
        order
    }

    #[test]
    fn test_new_capture_confirms_pending_order() {
        let order = unpaid_order();
        assert_eq!(capture_action(true, &order), Capture::Confirm);
    }

    #[test]
    fn test_repeated_capture_is_a_replay() {
        let mut order = unpaid_order();
        assert_eq!(capture_action(false, &order), Capture::Replay);

        order.payment_status = PaymentStatus::Completed;
        assert_eq!(capture_action(true, &order), Capture::Replay);
    }

    #[test]
    fn test_capture_on_cancelled_order_is_refunded() {
        let mut order = unpaid_order();
        order.status = OrderStatus::Cancelled;
        assert_eq!(capture_action(true, &order), Capture::Refund);

        // Wallet money already went back at cancellation.
        order.payment_status = PaymentStatus::Refunded;
        assert_eq!(capture_action(true, &order), Capture::Refund);
    }
}

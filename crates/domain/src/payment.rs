//! Payment intents and provider webhook reconciliation.
//!
//! The provider integration is mocked: an intent carries a QR payload
//! string, and the provider confirms or rejects it via a webhook. The
//! webhook path is idempotent so re-delivery of the same event is safe.

use chrono::Utc;
use common::{
    Money, OrderId, OrderStatus, PaymentId, PaymentStatus, TrackingEventType, UserId,
};
use serde::{Deserialize, Serialize};
use store::{FulfillmentStore, PaymentRecord};

use crate::audit::OrderMutation;
use crate::error::{FulfillmentError, Result};

/// A pending payment intent handed to the customer. `reused` is true
/// when an existing pending payment was returned instead of a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub amount: Money,
    pub mock_qr_text: String,
    pub reused: bool,
}

/// Provider webhook event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentSuccess,
    PaymentFailed,
}

impl WebhookEvent {
    /// Parses the provider's event string. Anything unknown is a
    /// `BadRequest`.
    pub fn parse(event: &str) -> Result<Self> {
        match event {
            "PAYMENT_SUCCESS" => Ok(Self::PaymentSuccess),
            "PAYMENT_FAILED" => Ok(Self::PaymentFailed),
            other => Err(FulfillmentError::BadRequest(format!(
                "unknown webhook event: {other}"
            ))),
        }
    }
}

/// Result of processing a webhook. `applied` is false for an idempotent
/// replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookOutcome {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub applied: bool,
}

/// Creates payment intents and reconciles webhook confirmations onto the
/// order.
pub struct PaymentService<S: FulfillmentStore> {
    store: S,
}

impl<S: FulfillmentStore> PaymentService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates (or reuses) a PENDING payment for the order's total.
    #[tracing::instrument(skip(self))]
    pub async fn create_intent(
        &self,
        user_id: UserId,
        order_id: OrderId,
        provider: &str,
    ) -> Result<PaymentIntent> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order_for_user(user_id, order_id)
            .await?
            .ok_or(FulfillmentError::NotFound("order"))?;

        if order.order_status == OrderStatus::Cancelled
            || order.payment_status != PaymentStatus::Pending
        {
            return Err(FulfillmentError::InvalidState(format!(
                "order is not payable in {}/{}",
                order.order_status, order.payment_status
            )));
        }

        let qr = mock_qr_text(&order.order_no, order.total);

        if let Some(pending) = tx
            .payments_for_order(order_id)
            .await?
            .into_iter()
            .find(|p| p.status == PaymentStatus::Pending)
        {
            tx.rollback().await?;
            return Ok(PaymentIntent {
                payment_id: pending.id,
                status: pending.status,
                amount: pending.amount,
                mock_qr_text: qr,
                reused: true,
            });
        }

        let payment = PaymentRecord {
            id: PaymentId::new(),
            order_id,
            provider: provider.to_string(),
            provider_ref: None,
            amount: order.total,
            status: PaymentStatus::Pending,
            paid_at: None,
            created_at: Utc::now(),
        };
        tx.insert_payment(&payment).await?;
        tx.commit().await?;

        metrics::counter!("payment_intents_total").increment(1);
        Ok(PaymentIntent {
            payment_id: payment.id,
            status: payment.status,
            amount: payment.amount,
            mock_qr_text: qr,
            reused: false,
        })
    }

    /// Applies a provider webhook to the payment and order.
    ///
    /// PAYMENT_SUCCESS marks the payment PAID and moves the order to
    /// PREPARING. PAYMENT_FAILED only marks the payment; the order stays
    /// payable through a new intent. Both replays are no-ops.
    #[tracing::instrument(skip(self))]
    pub async fn webhook(&self, payment_id: PaymentId, event: &str) -> Result<WebhookOutcome> {
        let event = WebhookEvent::parse(event)?;

        let mut tx = self.store.begin().await?;
        let mut payment = tx
            .find_payment(payment_id)
            .await?
            .ok_or(FulfillmentError::NotFound("payment"))?;

        match event {
            WebhookEvent::PaymentSuccess => {
                if payment.status == PaymentStatus::Paid {
                    tx.rollback().await?;
                    return Ok(WebhookOutcome {
                        payment_id,
                        status: payment.status,
                        applied: false,
                    });
                }

                let now = Utc::now();
                payment.status = PaymentStatus::Paid;
                payment.paid_at = Some(now);
                tx.update_payment(&payment).await?;

                if let Some(order) = tx.find_order(payment.order_id).await? {
                    let mut mutation = OrderMutation::of(order);
                    mutation.order_mut().payment_status = PaymentStatus::Paid;
                    mutation
                        .transition_to(
                            OrderStatus::Preparing,
                            None,
                            Some("payment confirmed".to_string()),
                        )
                        .with_event(
                            TrackingEventType::PaymentConfirmed,
                            Some("Payment confirmed".to_string()),
                            serde_json::json!({ "paymentId": payment.id, "amount": payment.amount }),
                        )
                        .with_event(
                            TrackingEventType::Preparing,
                            Some("Seller is preparing your order".to_string()),
                            serde_json::Value::Null,
                        )
                        .apply(tx.as_mut())
                        .await?;
                }
                tx.commit().await?;
                metrics::counter!("payments_confirmed_total").increment(1);
            }
            WebhookEvent::PaymentFailed => {
                if payment.status == PaymentStatus::Failed {
                    tx.rollback().await?;
                    return Ok(WebhookOutcome {
                        payment_id,
                        status: payment.status,
                        applied: false,
                    });
                }
                payment.status = PaymentStatus::Failed;
                tx.update_payment(&payment).await?;
                tx.commit().await?;
                metrics::counter!("payments_failed_total").increment(1);
            }
        }

        Ok(WebhookOutcome {
            payment_id,
            status: payment.status,
            applied: true,
        })
    }
}

/// The mock QR payload the customer scans to pay.
fn mock_qr_text(order_no: &str, total: Money) -> String {
    format!("PROMPTPAY|ORDER:{order_no}|AMOUNT:{total}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_event_parsing() {
        assert_eq!(
            WebhookEvent::parse("PAYMENT_SUCCESS").unwrap(),
            WebhookEvent::PaymentSuccess
        );
        assert_eq!(
            WebhookEvent::parse("PAYMENT_FAILED").unwrap(),
            WebhookEvent::PaymentFailed
        );
        assert!(matches!(
            WebhookEvent::parse("PAYMENT_MAYBE"),
            Err(FulfillmentError::BadRequest(_))
        ));
    }

    #[test]
    fn qr_text_format() {
        let qr = mock_qr_text("OR260830-AB12CD", Money::from_units(560));
        assert_eq!(qr, "PROMPTPAY|ORDER:OR260830-AB12CD|AMOUNT:560.00");
    }
}

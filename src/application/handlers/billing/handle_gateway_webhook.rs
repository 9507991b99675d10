//! HandleGatewayWebhookHandler - payment events pushed by the gateway.
//!
//! Business no-ops (unknown order, already completed, rejected payment) are
//! returned as `Ok` so the gateway stops redelivering. Only transient and
//! inconsistent-state errors propagate.
//!
//! An unsigned body never moves an entry to `failed`: anyone can post one.
//! Unsigned captures may still activate once the gateway lookup confirms them.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use super::verification_engine::PaymentVerificationEngine;
use crate::domain::billing::{
    signature, BillingError, GatewayEvent, GatewayEventKind, GatewayPayment, PaymentEvidence,
};
use crate::domain::foundation::{Timestamp, TransactionId};

/// Command to handle a gateway webhook.
#[derive(Debug, Clone)]
pub struct HandleGatewayWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// Value of the `X-Razorpay-Signature` header, if sent.
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Activated { transaction_id: TransactionId },
    AlreadyCompleted { transaction_id: TransactionId },
    MarkedFailed { transaction_id: TransactionId },
    /// Acknowledged with no state change.
    Ignored { reason: String },
}

pub struct HandleGatewayWebhookHandler {
    engine: Arc<PaymentVerificationEngine>,
    webhook_secret: Option<SecretString>,
}

impl HandleGatewayWebhookHandler {
    /// Without a `webhook_secret`, payloads are unauthenticated: a captured
    /// payment is only trusted after the gateway lookup confirms it, and
    /// failure notices are ignored.
    pub fn new(engine: Arc<PaymentVerificationEngine>, webhook_secret: Option<SecretString>) -> Self {
        Self {
            engine,
            webhook_secret,
        }
    }

    pub async fn handle(&self, cmd: HandleGatewayWebhookCommand) -> Result<WebhookOutcome, BillingError> {
        // 1. Authenticate the body
        let verified = match &self.webhook_secret {
            Some(secret) => {
                let provided = cmd.signature.as_deref().unwrap_or_default();
                if !signature::verify(secret.expose_secret().as_bytes(), &cmd.payload, provided) {
                    tracing::warn!(
                        signature_present = cmd.signature.is_some(),
                        "Webhook signature rejected"
                    );
                    return Err(BillingError::invalid_webhook_signature());
                }
                true
            }
            None => false,
        };

        // 2. Parse
        let event = GatewayEvent::parse(&cmd.payload).map_err(|e| {
            BillingError::validation("payload", format!("malformed webhook body: {e}"))
        })?;

        // 3. Dispatch
        let kind = event.kind();
        let payment = match (&kind, event.payment()) {
            (GatewayEventKind::Other(name), _) => {
                tracing::debug!(event = %name, "Ignoring unhandled webhook event");
                return Ok(ignored(format!("unhandled event {name}")));
            }
            (_, None) => return Ok(ignored("event carries no payment entity")),
            (_, Some(payment)) => payment.clone(),
        };

        match kind {
            GatewayEventKind::PaymentCaptured => self.payment_captured(payment, verified).await,
            GatewayEventKind::PaymentFailed => self.payment_failed(payment, verified).await,
            GatewayEventKind::Other(_) => Ok(ignored("unhandled event")),
        }
    }

    async fn payment_captured(
        &self,
        payment: GatewayPayment,
        verified: bool,
    ) -> Result<WebhookOutcome, BillingError> {
        let Some(order_id) = payment.order_id.clone() else {
            return Ok(ignored("captured payment has no order id"));
        };

        let Some(entry) = self.engine.ledger().find_by_order(&order_id).await? else {
            tracing::info!(order_id = %order_id, "Webhook for unknown order acknowledged");
            return Ok(ignored(format!("unknown order {order_id}")));
        };
        let transaction_id = entry.transaction_id;

        let evidence = PaymentEvidence::from_webhook(order_id.as_str(), payment, verified);
        match self.engine.process(entry, evidence).await {
            Ok(activation) if activation.replayed => Ok(WebhookOutcome::AlreadyCompleted { transaction_id }),
            Ok(_) => Ok(WebhookOutcome::Activated { transaction_id }),
            Err(
                err @ (BillingError::NotFound { .. }
                | BillingError::Conflict { .. }
                | BillingError::VerificationFailed { .. }),
            ) => {
                tracing::info!(
                    order_id = %order_id,
                    reason = %err,
                    "Captured-payment webhook acknowledged without activation"
                );
                Ok(ignored(err.message()))
            }
            Err(err) => Err(err),
        }
    }

    async fn payment_failed(
        &self,
        payment: GatewayPayment,
        verified: bool,
    ) -> Result<WebhookOutcome, BillingError> {
        if !verified {
            tracing::warn!(payment_id = %payment.id, "Unsigned payment failure notice ignored");
            return Ok(ignored("unsigned failure notice"));
        }
        let Some(order_id) = payment.order_id.as_deref() else {
            return Ok(ignored("failed payment has no order id"));
        };

        let Some(entry) = self.engine.ledger().find_by_order(order_id).await? else {
            return Ok(ignored(format!("unknown order {order_id}")));
        };

        let reason = payment
            .error_description
            .clone()
            .unwrap_or_else(|| "payment failed at gateway".to_string());

        let marked = self
            .engine
            .ledger()
            .mark_failed_if_pending(&entry.transaction_id, &reason, Timestamp::now())
            .await?;

        if marked {
            tracing::info!(
                transaction_id = %entry.transaction_id,
                order_id = %order_id,
                reason = %reason,
                "Transaction marked failed by gateway"
            );
            Ok(WebhookOutcome::MarkedFailed {
                transaction_id: entry.transaction_id,
            })
        } else {
            Ok(ignored(format!("transaction is {}", entry.status.as_str())))
        }
    }
}

fn ignored(reason: impl Into<String>) -> WebhookOutcome {
    WebhookOutcome::Ignored { reason: reason.into() }
}

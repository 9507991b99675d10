//! Payment authenticity verification.
//!
//! A payment is proven by the first step in a `VerificationChain` that returns
//! `Verified`. The standard chain is:
//!
//! 1. `ClientSignatureStep` - HMAC over `order_id|payment_id` forwarded by the client
//! 2. `WebhookAttestationStep` - payment entity inside a signature-checked webhook
//! 3. `GatewayLookupStep` - ask the gateway directly, with bounded retries
//!
//! When no step verifies, the verdict is the most hopeful of what was seen:
//! a payment still in flight beats an unreachable gateway, which beats an
//! outright rejection. Only a rejection should fail the ledger entry.

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;
use std::time::Duration;

use super::signature::verify_payment_signature;
use super::{GatewayPayment, VerificationMethod};
use crate::ports::{GatewayError, PaymentGateway};

/// What is known about a payment when verification starts.
#[derive(Debug, Clone, Default)]
pub struct PaymentEvidence {
    pub order_id: String,
    pub payment_id: Option<String>,
    /// Signature forwarded by the client after checkout.
    pub client_signature: Option<String>,
    /// Payment entity from a webhook whose body signature has been verified.
    pub attested_payment: Option<GatewayPayment>,
    /// The sender is known: the order owner or a signed webhook. Only a known
    /// sender's rejected evidence may fail the ledger entry.
    pub authenticated: bool,
}

impl PaymentEvidence {
    pub fn from_client(
        order_id: impl Into<String>,
        payment_id: impl Into<String>,
        signature: Option<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            payment_id: Some(payment_id.into()),
            client_signature: signature.filter(|s| !s.trim().is_empty()),
            attested_payment: None,
            authenticated: true,
        }
    }

    /// Evidence from a webhook. `signature_verified` says whether the body
    /// signature was checked; unsigned payloads are only a lookup hint.
    pub fn from_webhook(order_id: impl Into<String>, payment: GatewayPayment, signature_verified: bool) -> Self {
        Self {
            order_id: order_id.into(),
            payment_id: Some(payment.id.clone()),
            client_signature: None,
            attested_payment: signature_verified.then_some(payment),
            authenticated: signature_verified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Verified {
        payment_id: String,
        method: VerificationMethod,
    },
    /// The step has nothing to check for this evidence.
    NotApplicable,
    /// The payment exists for this order but is not captured yet.
    Pending { reason: String },
    Rejected { reason: String },
}

#[async_trait]
pub trait VerificationStep: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, evidence: &PaymentEvidence) -> Result<StepOutcome, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Verified {
        payment_id: String,
        method: VerificationMethod,
    },
    Pending(String),
    Unavailable(String),
    Rejected(String),
}

/// Ordered list of verification steps.
pub struct VerificationChain {
    steps: Vec<Box<dyn VerificationStep>>,
}

impl VerificationChain {
    pub fn new(steps: Vec<Box<dyn VerificationStep>>) -> Self {
        Self { steps }
    }

    /// Client signature, webhook attestation, then gateway lookup.
    pub fn standard(
        key_secret: Secret<String>,
        gateway: Arc<dyn PaymentGateway>,
        retry: RetryPolicy,
    ) -> Self {
        Self::new(vec![
            Box::new(ClientSignatureStep::new(key_secret)),
            Box::new(WebhookAttestationStep),
            Box::new(GatewayLookupStep::new(gateway, retry)),
        ])
    }

    pub async fn run(&self, evidence: &PaymentEvidence) -> Verdict {
        let mut pending: Option<String> = None;
        let mut unavailable: Option<String> = None;
        let mut rejections: Vec<String> = Vec::new();

        for step in &self.steps {
            match step.check(evidence).await {
                Ok(StepOutcome::Verified { payment_id, method }) => {
                    tracing::debug!(
                        order_id = %evidence.order_id,
                        step = step.name(),
                        "Payment verified"
                    );
                    return Verdict::Verified { payment_id, method };
                }
                Ok(StepOutcome::NotApplicable) => {}
                Ok(StepOutcome::Pending { reason }) => {
                    pending.get_or_insert(reason);
                }
                Ok(StepOutcome::Rejected { reason }) => {
                    tracing::warn!(
                        order_id = %evidence.order_id,
                        step = step.name(),
                        reason = %reason,
                        "Verification step rejected payment"
                    );
                    rejections.push(format!("{}: {}", step.name(), reason));
                }
                Err(err) => {
                    tracing::warn!(
                        order_id = %evidence.order_id,
                        step = step.name(),
                        error = %err,
                        "Verification step could not reach gateway"
                    );
                    unavailable.get_or_insert(err.to_string());
                }
            }
        }

        if let Some(reason) = pending {
            Verdict::Pending(reason)
        } else if let Some(reason) = unavailable {
            Verdict::Unavailable(reason)
        } else if rejections.is_empty() {
            Verdict::Rejected("no verifiable payment evidence".to_string())
        } else {
            Verdict::Rejected(rejections.join("; "))
        }
    }
}

/// HMAC check of the client-forwarded signature.
pub struct ClientSignatureStep {
    key_secret: Secret<String>,
}

impl ClientSignatureStep {
    pub fn new(key_secret: Secret<String>) -> Self {
        Self { key_secret }
    }
}

#[async_trait]
impl VerificationStep for ClientSignatureStep {
    fn name(&self) -> &'static str {
        "client_signature"
    }

    async fn check(&self, evidence: &PaymentEvidence) -> Result<StepOutcome, GatewayError> {
        let (Some(payment_id), Some(signature)) = (&evidence.payment_id, &evidence.client_signature) else {
            return Ok(StepOutcome::NotApplicable);
        };

        if verify_payment_signature(
            self.key_secret.expose_secret().as_bytes(),
            &evidence.order_id,
            payment_id,
            signature,
        ) {
            Ok(StepOutcome::Verified {
                payment_id: payment_id.clone(),
                method: VerificationMethod::ClientSignature,
            })
        } else {
            Ok(StepOutcome::Rejected {
                reason: "signature mismatch".to_string(),
            })
        }
    }
}

/// Accepts a captured payment carried by a signature-verified webhook.
pub struct WebhookAttestationStep;

#[async_trait]
impl VerificationStep for WebhookAttestationStep {
    fn name(&self) -> &'static str {
        "webhook_attestation"
    }

    async fn check(&self, evidence: &PaymentEvidence) -> Result<StepOutcome, GatewayError> {
        let Some(payment) = &evidence.attested_payment else {
            return Ok(StepOutcome::NotApplicable);
        };
        Ok(judge_payment(payment, &evidence.order_id, VerificationMethod::WebhookSignature))
    }
}

/// Bounded retry with linear backoff for gateway calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(250))
    }
}

/// Asks the gateway for the payment and accepts only a captured payment
/// whose order id matches.
pub struct GatewayLookupStep {
    gateway: Arc<dyn PaymentGateway>,
    retry: RetryPolicy,
}

impl GatewayLookupStep {
    pub fn new(gateway: Arc<dyn PaymentGateway>, retry: RetryPolicy) -> Self {
        Self { gateway, retry }
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<GatewayPayment>, GatewayError> {
        let mut attempt = 1;
        loop {
            match self.gateway.fetch_payment(payment_id).await {
                Ok(payment) => return Ok(payment),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    tracing::debug!(payment_id, attempt, error = %err, "Retrying payment lookup");
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn list_payments(&self, order_id: &str) -> Result<Vec<GatewayPayment>, GatewayError> {
        let mut attempt = 1;
        loop {
            match self.gateway.list_payments_for_order(order_id).await {
                Ok(payments) => return Ok(payments),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    tracing::debug!(order_id, attempt, error = %err, "Retrying order payments lookup");
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl VerificationStep for GatewayLookupStep {
    fn name(&self) -> &'static str {
        "gateway_lookup"
    }

    async fn check(&self, evidence: &PaymentEvidence) -> Result<StepOutcome, GatewayError> {
        if let Some(payment_id) = &evidence.payment_id {
            return Ok(match self.fetch_payment(payment_id).await? {
                Some(payment) => {
                    judge_payment(&payment, &evidence.order_id, VerificationMethod::GatewayLookup)
                }
                None => StepOutcome::Rejected {
                    reason: format!("gateway has no payment {}", payment_id),
                },
            });
        }

        let payments = self.list_payments(&evidence.order_id).await?;
        let ours: Vec<&GatewayPayment> = payments
            .iter()
            .filter(|p| p.belongs_to_order(&evidence.order_id))
            .collect();

        if let Some(captured) = ours.iter().find(|p| p.is_captured()) {
            return Ok(StepOutcome::Verified {
                payment_id: captured.id.clone(),
                method: VerificationMethod::GatewayLookup,
            });
        }
        if ours.iter().any(|p| p.is_in_flight()) {
            return Ok(StepOutcome::Pending {
                reason: "payment not captured yet".to_string(),
            });
        }
        Ok(StepOutcome::Rejected {
            reason: "no captured payment for order".to_string(),
        })
    }
}

fn judge_payment(payment: &GatewayPayment, order_id: &str, method: VerificationMethod) -> StepOutcome {
    if !payment.belongs_to_order(order_id) {
        return StepOutcome::Rejected {
            reason: format!("payment {} belongs to a different order", payment.id),
        };
    }
    if payment.is_captured() {
        StepOutcome::Verified {
            payment_id: payment.id.clone(),
            method,
        }
    } else if payment.is_in_flight() {
        StepOutcome::Pending {
            reason: format!("payment status is {}", payment.status),
        }
    } else {
        StepOutcome::Rejected {
            reason: format!("payment status is {}", payment.status),
        }
    }
}

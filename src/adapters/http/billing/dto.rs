//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the billing API.
//! They serve as the boundary between HTTP and the application layer.

use serde::{Deserialize, Serialize};

use crate::application::{Activation, CreateOrderResult, SubscriptionView, WebhookOutcome};
use crate::domain::billing::{
    LedgerEntry, Plan, SubscriptionState, SubscriptionStatus, TransactionStatus,
    VerificationMethod,
};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to open a checkout order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub plan_id: String,
}

/// Client report of a finished checkout.
///
/// Accepts the gateway's own field names (`razorpay_order_id`, ...) as aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(alias = "razorpay_order_id")]
    pub order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub payment_id: String,
    #[serde(default, alias = "razorpay_signature")]
    pub signature: Option<String>,
    pub plan_id: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    pub plan_id: String,
    pub display_name: String,
    pub price_minor_units: i64,
    pub currency: String,
    /// Human-readable price, e.g. `499.00 INR`.
    pub display_price: String,
    pub duration_months: u32,
    pub features: Vec<String>,
}

impl From<&Plan> for PlanResponse {
    fn from(plan: &Plan) -> Self {
        Self {
            plan_id: plan.plan_id.to_string(),
            display_name: plan.display_name.clone(),
            price_minor_units: plan.price_minor_units,
            currency: plan.currency.clone(),
            display_price: plan.display_price(),
            duration_months: plan.duration_months,
            features: plan.features.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanListResponse {
    pub plans: Vec<PlanResponse>,
}

/// Everything the client needs to open the gateway checkout.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub transaction_id: String,
    /// Public key id for the gateway's checkout widget.
    pub key_id: String,
    pub plan: PlanResponse,
}

impl OrderResponse {
    pub fn new(result: CreateOrderResult, key_id: &str) -> Self {
        Self {
            order_id: result.order.order_id,
            amount: result.order.amount_minor_units,
            currency: result.order.currency,
            transaction_id: result.transaction_id.to_string(),
            key_id: key_id.to_string(),
            plan: PlanResponse::from(&result.plan),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub plan_id: String,
    pub status: SubscriptionStatus,
    /// ISO 8601.
    pub start_date: String,
    /// ISO 8601.
    pub end_date: String,
    pub activation_reference: String,
    pub amount_paid: i64,
}

impl From<&SubscriptionState> for SubscriptionResponse {
    fn from(s: &SubscriptionState) -> Self {
        Self {
            plan_id: s.plan_id.to_string(),
            status: s.status,
            start_date: s.start_date.as_datetime().to_rfc3339(),
            end_date: s.end_date.as_datetime().to_rfc3339(),
            activation_reference: s.activation_reference.clone(),
            amount_paid: s.amount_paid,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyPaymentResponse {
    pub transaction_id: String,
    pub subscription: SubscriptionResponse,
    pub plan: PlanResponse,
    /// True when the order had already been completed.
    pub already_processed: bool,
    /// True when `subscription` was activated by a later order than this one.
    pub superseded: bool,
}

impl From<Activation> for VerifyPaymentResponse {
    fn from(a: Activation) -> Self {
        Self {
            transaction_id: a.transaction_id.to_string(),
            subscription: SubscriptionResponse::from(&a.subscription),
            plan: PlanResponse::from(&a.plan),
            already_processed: a.replayed,
            superseded: a.superseded,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionViewResponse {
    pub subscription: Option<SubscriptionResponse>,
    pub plan: Option<PlanResponse>,
    /// Status as of now; an elapsed active period reads `expired`.
    pub status: Option<SubscriptionStatus>,
    pub has_active_subscription: bool,
    pub days_remaining: i64,
}

impl From<SubscriptionView> for SubscriptionViewResponse {
    fn from(view: SubscriptionView) -> Self {
        Self {
            subscription: view.subscription.as_ref().map(SubscriptionResponse::from),
            plan: view.plan.as_ref().map(PlanResponse::from),
            status: view.effective_status,
            has_active_subscription: view.has_active_subscription,
            days_remaining: view.days_remaining,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub transaction_id: String,
    pub order_id: String,
    pub payment_id: Option<String>,
    pub plan_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub verification_method: Option<VerificationMethod>,
    pub failure_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<LedgerEntry> for TransactionResponse {
    fn from(e: LedgerEntry) -> Self {
        Self {
            transaction_id: e.transaction_id.to_string(),
            order_id: e.gateway_order_id,
            payment_id: e.gateway_payment_id,
            plan_id: e.plan_id.to_string(),
            amount: e.amount_minor_units,
            currency: e.currency,
            status: e.status,
            verification_method: e.verification_method,
            failure_reason: e.failure_reason,
            created_at: e.created_at.as_datetime().to_rfc3339(),
            updated_at: e.updated_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionResponse>,
}

/// Body returned to the gateway for every acknowledged webhook.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    pub outcome: &'static str,
}

impl From<&WebhookOutcome> for WebhookAckResponse {
    fn from(outcome: &WebhookOutcome) -> Self {
        let outcome = match outcome {
            WebhookOutcome::Activated { .. } => "activated",
            WebhookOutcome::AlreadyCompleted { .. } => "already_completed",
            WebhookOutcome::MarkedFailed { .. } => "marked_failed",
            WebhookOutcome::Ignored { .. } => "ignored",
        };
        Self {
            received: true,
            outcome,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Error body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

//! Ledger entries: one per checkout attempt.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PlanId, StateMachine, Timestamp, TransactionId, UserId};

/// Status of a ledger entry.
///
/// ```text
/// pending ──► completed ──► refunded
///    │
///    └──────► failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransactionStatus::Pending),
            "completed" => Some(TransactionStatus::Completed),
            "failed" => Some(TransactionStatus::Failed),
            "refunded" => Some(TransactionStatus::Refunded),
            _ => None,
        }
    }
}

impl StateMachine for TransactionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, target),
            (Pending, Completed) | (Pending, Failed) | (Completed, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TransactionStatus::*;
        match self {
            Pending => vec![Completed, Failed],
            Completed => vec![Refunded],
            Failed | Refunded => vec![],
        }
    }
}

/// How a payment was proven authentic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    /// HMAC over `order_id|payment_id` supplied by the client.
    ClientSignature,
    /// Payment entity carried in a webhook whose body signature checked out.
    WebhookSignature,
    /// Payment fetched from the gateway API and found captured.
    GatewayLookup,
}

impl VerificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMethod::ClientSignature => "client_signature",
            VerificationMethod::WebhookSignature => "webhook_signature",
            VerificationMethod::GatewayLookup => "gateway_lookup",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client_signature" => Some(VerificationMethod::ClientSignature),
            "webhook_signature" => Some(VerificationMethod::WebhookSignature),
            "gateway_lookup" => Some(VerificationMethod::GatewayLookup),
            _ => None,
        }
    }
}

/// Persisted record of a payment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    /// Unique across the ledger.
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub verification_method: Option<VerificationMethod>,
    pub amount_minor_units: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl LedgerEntry {
    /// A fresh `pending` entry for an order just created at the gateway.
    pub fn pending(
        transaction_id: TransactionId,
        user_id: UserId,
        plan_id: PlanId,
        gateway_order_id: impl Into<String>,
        amount_minor_units: i64,
        currency: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            transaction_id,
            user_id,
            plan_id,
            gateway_order_id: gateway_order_id.into(),
            gateway_payment_id: None,
            gateway_signature: None,
            verification_method: None,
            amount_minor_units,
            currency: currency.into(),
            status: TransactionStatus::Pending,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_complete_or_fail() {
        assert!(TransactionStatus::Pending.can_transition_to(&TransactionStatus::Completed));
        assert!(TransactionStatus::Pending.can_transition_to(&TransactionStatus::Failed));
    }

    #[test]
    fn completed_cannot_go_back_to_pending_or_fail() {
        assert!(TransactionStatus::Completed
            .transition_to(TransactionStatus::Pending)
            .is_err());
        assert!(TransactionStatus::Completed
            .transition_to(TransactionStatus::Failed)
            .is_err());
    }

    #[test]
    fn failed_and_refunded_are_terminal() {
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(TransactionStatus::Refunded.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
    }

    #[test]
    fn status_string_round_trips() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Completed,
            TransactionStatus::Failed,
            TransactionStatus::Refunded,
        ] {
            assert_eq!(TransactionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TransactionStatus::parse("captured"), None);
    }

    #[test]
    fn pending_entry_has_no_payment_details() {
        let entry = LedgerEntry::pending(
            TransactionId::new(),
            UserId::new("user-1").unwrap(),
            PlanId::new("basic").unwrap(),
            "order_abc",
            49_900,
            "INR",
            Timestamp::now(),
        );

        assert!(entry.is_pending());
        assert!(entry.gateway_payment_id.is_none());
        assert!(entry.verification_method.is_none());
    }

    #[test]
    fn verification_method_serializes_snake_case() {
        let json = serde_json::to_string(&VerificationMethod::GatewayLookup).unwrap();
        assert_eq!(json, "\"gateway_lookup\"");
    }
}

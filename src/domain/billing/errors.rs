//! Billing error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | Conflict | 409 |
//! | VerificationFailed | 400 |
//! | InvalidWebhookSignature | 401 |
//! | ValidationFailed | 400 |
//! | UpstreamUnavailable | 503 |
//! | InconsistentState | 500 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{ErrorCode, ValidationError};

/// What a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Plan,
    Account,
    Transaction,
}

impl Resource {
    fn as_str(&self) -> &'static str {
        match self {
            Resource::Plan => "Plan",
            Resource::Account => "Account",
            Resource::Transaction => "Transaction",
        }
    }
}

/// Billing errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Unknown plan, account or order.
    NotFound { resource: Resource, id: String },

    /// The requested transition is not allowed from the current state:
    /// already subscribed, nothing to cancel, or a terminal ledger entry.
    Conflict { resource: Resource, reason: String },

    /// No verification step could prove the payment. The caller may retry.
    VerificationFailed { reason: String },

    /// The payment gateway could not be reached after bounded retries.
    UpstreamUnavailable(String),

    /// Committed state disagrees with what activation should have produced.
    InconsistentState(String),

    /// Webhook body signature missing or wrong.
    InvalidWebhookSignature,

    ValidationFailed { field: String, message: String },

    Infrastructure(String),
}

impl BillingError {
    pub fn not_found(resource: Resource, id: impl Into<String>) -> Self {
        BillingError::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn conflict(resource: Resource, reason: impl Into<String>) -> Self {
        BillingError::Conflict {
            resource,
            reason: reason.into(),
        }
    }

    pub fn verification_failed(reason: impl Into<String>) -> Self {
        BillingError::VerificationFailed {
            reason: reason.into(),
        }
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        BillingError::UpstreamUnavailable(message.into())
    }

    pub fn inconsistent_state(message: impl Into<String>) -> Self {
        BillingError::InconsistentState(message.into())
    }

    pub fn invalid_webhook_signature() -> Self {
        BillingError::InvalidWebhookSignature
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::NotFound { resource, .. } => match resource {
                Resource::Plan => ErrorCode::PlanNotFound,
                Resource::Account => ErrorCode::AccountNotFound,
                Resource::Transaction => ErrorCode::TransactionNotFound,
            },
            BillingError::Conflict { resource, .. } => match resource {
                Resource::Transaction => ErrorCode::TransactionConflict,
                Resource::Plan | Resource::Account => ErrorCode::SubscriptionConflict,
            },
            BillingError::VerificationFailed { .. } => ErrorCode::PaymentVerificationFailed,
            BillingError::UpstreamUnavailable(_) => ErrorCode::GatewayUnavailable,
            BillingError::InconsistentState(_) => ErrorCode::InconsistentState,
            BillingError::InvalidWebhookSignature => ErrorCode::InvalidWebhookSignature,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::NotFound { resource, id } => {
                format!("{} not found: {}", resource.as_str(), id)
            }
            BillingError::Conflict { reason, .. } => reason.clone(),
            BillingError::VerificationFailed { reason } => {
                format!("Payment verification failed: {}", reason)
            }
            BillingError::UpstreamUnavailable(msg) => {
                format!("Payment gateway unavailable: {}", msg)
            }
            BillingError::InconsistentState(msg) => format!("Inconsistent state: {}", msg),
            BillingError::InvalidWebhookSignature => "Invalid webhook signature".to_string(),
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::VerificationFailed { .. }
                | BillingError::UpstreamUnavailable(_)
                | BillingError::InconsistentState(_)
                | BillingError::Infrastructure(_)
        )
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_code_depends_on_resource() {
        assert_eq!(
            BillingError::not_found(Resource::Plan, "gold").code(),
            ErrorCode::PlanNotFound
        );
        assert_eq!(
            BillingError::not_found(Resource::Transaction, "order_1").code(),
            ErrorCode::TransactionNotFound
        );
    }

    #[test]
    fn not_found_message_names_resource() {
        let err = BillingError::not_found(Resource::Account, "user-1");
        assert_eq!(err.to_string(), "Account not found: user-1");
    }

    #[test]
    fn conflict_on_account_is_subscription_conflict() {
        let err = BillingError::conflict(Resource::Account, "Already subscribed");
        assert_eq!(err.code(), ErrorCode::SubscriptionConflict);
        assert_eq!(err.message(), "Already subscribed");
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(BillingError::upstream_unavailable("timeout").is_retryable());
        assert!(BillingError::verification_failed("not captured").is_retryable());
        assert!(!BillingError::invalid_webhook_signature().is_retryable());
        assert!(!BillingError::conflict(Resource::Transaction, "failed").is_retryable());
    }

    #[test]
    fn validation_error_converts_with_field() {
        let err: BillingError = ValidationError::empty_field("plan_id").into();
        assert!(matches!(err, BillingError::ValidationFailed { ref field, .. } if field == "plan_id"));
    }
}

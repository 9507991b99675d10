//! Notification port for post-activation messages.
//!
//! Delivery is best-effort: callers log failures and move on.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::Timestamp;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_subscription_confirmation(
        &self,
        confirmation: &SubscriptionConfirmation,
    ) -> Result<(), NotificationError>;
}

/// Content of the "your subscription is active" message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionConfirmation {
    pub recipient_email: String,
    pub recipient_name: String,
    pub plan_name: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub valid_until: Timestamp,
    pub transaction_reference: String,
}

#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Notification transport failed: {0}")]
    Transport(String),

    #[error("Notification rejected by provider ({status}): {message}")]
    Rejected { status: u16, message: String },
}

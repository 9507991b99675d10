//! Notifier that only logs. Used when no email provider is configured.

use async_trait::async_trait;

use crate::ports::{NotificationError, NotificationSink, SubscriptionConfirmation};

#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn send_subscription_confirmation(
        &self,
        confirmation: &SubscriptionConfirmation,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            recipient = %confirmation.recipient_email,
            plan = %confirmation.plan_name,
            valid_until = %confirmation.valid_until.as_datetime(),
            reference = %confirmation.transaction_reference,
            "Subscription confirmation (email delivery disabled)"
        );
        Ok(())
    }
}

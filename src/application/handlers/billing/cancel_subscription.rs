//! CancelSubscriptionHandler - stops an active subscription, keeping its paid period.

use std::sync::Arc;

use crate::domain::billing::{BillingError, SubscriptionState};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::AccountRepository;

#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: UserId,
}

pub struct CancelSubscriptionHandler {
    accounts: Arc<dyn AccountRepository>,
}

impl CancelSubscriptionHandler {
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }

    /// # Errors
    ///
    /// - `NotFound` if the account does not exist
    /// - `Conflict` if there is no active subscription
    pub async fn handle(&self, cmd: CancelSubscriptionCommand) -> Result<SubscriptionState, BillingError> {
        let cancelled = self
            .accounts
            .cancel_subscription(&cmd.user_id, Timestamp::now())
            .await?;

        tracing::info!(
            user_id = %cmd.user_id,
            plan_id = %cancelled.plan_id,
            end_date = %cancelled.end_date.as_datetime(),
            "Subscription cancelled"
        );

        Ok(cancelled)
    }
}

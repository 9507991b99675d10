//! Read-side handlers: current subscription view and ledger history.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, LedgerEntry, Plan, PlanCatalog, Resource, SubscriptionState, SubscriptionStatus,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{AccountRepository, TransactionLedger};

/// Subscription as observed now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionView {
    pub subscription: Option<SubscriptionState>,
    /// Catalog entry for the subscribed plan, if it is still offered.
    pub plan: Option<Plan>,
    /// Stored status with elapsed active periods read as expired.
    pub effective_status: Option<SubscriptionStatus>,
    pub has_active_subscription: bool,
    /// Whole days left in the paid period; zero when inactive.
    pub days_remaining: i64,
}

impl SubscriptionView {
    pub fn at(subscription: Option<SubscriptionState>, catalog: &PlanCatalog, now: &Timestamp) -> Self {
        let has_active_subscription = subscription
            .as_ref()
            .map(|s| s.has_active_subscription(now))
            .unwrap_or(false);
        let days_remaining = match &subscription {
            Some(s) if has_active_subscription => s.end_date.days_until(now),
            _ => 0,
        };
        Self {
            plan: subscription
                .as_ref()
                .and_then(|s| catalog.get_plan(&s.plan_id).ok().cloned()),
            effective_status: subscription.as_ref().map(|s| s.effective_status(now)),
            has_active_subscription,
            days_remaining,
            subscription,
        }
    }
}

pub struct GetSubscriptionHandler {
    accounts: Arc<dyn AccountRepository>,
    catalog: Arc<PlanCatalog>,
}

impl GetSubscriptionHandler {
    pub fn new(accounts: Arc<dyn AccountRepository>, catalog: Arc<PlanCatalog>) -> Self {
        Self { accounts, catalog }
    }

    pub async fn handle(&self, user_id: &UserId) -> Result<SubscriptionView, BillingError> {
        let account = self
            .accounts
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| BillingError::not_found(Resource::Account, user_id.as_str()))?;

        Ok(SubscriptionView::at(account.subscription, &self.catalog, &Timestamp::now()))
    }
}

pub struct ListTransactionsHandler {
    ledger: Arc<dyn TransactionLedger>,
}

impl ListTransactionsHandler {
    pub fn new(ledger: Arc<dyn TransactionLedger>) -> Self {
        Self { ledger }
    }

    /// The user's ledger entries, newest first.
    pub async fn handle(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, BillingError> {
        self.ledger.list_for_user(user_id).await
    }
}

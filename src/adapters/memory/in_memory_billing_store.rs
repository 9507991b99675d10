//! In-memory billing store.
//!
//! Implements both `TransactionLedger` and `AccountRepository` over one lock,
//! so activation is atomic the same way the Postgres transaction is.
//! Useful for testing and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{
    no_active_subscription, BillingError, LedgerEntry, Resource, SubscriptionState,
    TransactionStatus, UserAccount,
};
use crate::domain::foundation::{StateMachine, Timestamp, TransactionId, UserId};
use crate::ports::{AccountRepository, ActivationCommit, CommitOutcome, TransactionLedger};

#[derive(Debug, Default)]
struct Tables {
    entries: HashMap<TransactionId, LedgerEntry>,
    accounts: HashMap<UserId, UserAccount>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an account (stands in for the registration flow).
    pub async fn upsert_account(&self, account: UserAccount) {
        let mut tables = self.tables.write().await;
        tables.accounts.insert(account.user_id.clone(), account);
    }

    pub async fn entry_count(&self) -> usize {
        self.tables.read().await.entries.len()
    }

    /// Number of entries in the given status.
    pub async fn count_with_status(&self, status: TransactionStatus) -> usize {
        self.tables
            .read()
            .await
            .entries
            .values()
            .filter(|e| e.status == status)
            .count()
    }
}

#[async_trait]
impl TransactionLedger for InMemoryBillingStore {
    async fn insert(&self, entry: &LedgerEntry) -> Result<(), BillingError> {
        let mut tables = self.tables.write().await;
        if tables
            .entries
            .values()
            .any(|e| e.gateway_order_id == entry.gateway_order_id)
        {
            return Err(BillingError::conflict(
                Resource::Transaction,
                format!("Order {} is already recorded", entry.gateway_order_id),
            ));
        }
        tables.entries.insert(entry.transaction_id, entry.clone());
        Ok(())
    }

    async fn find_by_order_for_user(
        &self,
        gateway_order_id: &str,
        user_id: &UserId,
    ) -> Result<Option<LedgerEntry>, BillingError> {
        let tables = self.tables.read().await;
        Ok(tables
            .entries
            .values()
            .find(|e| e.gateway_order_id == gateway_order_id && &e.user_id == user_id)
            .cloned())
    }

    async fn find_by_order(&self, gateway_order_id: &str) -> Result<Option<LedgerEntry>, BillingError> {
        let tables = self.tables.read().await;
        Ok(tables
            .entries
            .values()
            .find(|e| e.gateway_order_id == gateway_order_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, BillingError> {
        let tables = self.tables.read().await;
        let mut entries: Vec<LedgerEntry> = tables
            .entries
            .values()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn mark_failed_if_pending(
        &self,
        transaction_id: &TransactionId,
        reason: &str,
        now: Timestamp,
    ) -> Result<bool, BillingError> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .entries
            .get_mut(transaction_id)
            .ok_or_else(|| BillingError::not_found(Resource::Transaction, transaction_id.to_string()))?;

        if !entry.is_pending() {
            return Ok(false);
        }
        entry.status = entry.status.transition_to(TransactionStatus::Failed)?;
        entry.failure_reason = Some(reason.to_string());
        entry.updated_at = now;
        Ok(true)
    }

    async fn commit_activation(&self, commit: ActivationCommit) -> Result<CommitOutcome, BillingError> {
        let mut tables = self.tables.write().await;

        let status = tables
            .entries
            .get(&commit.transaction_id)
            .map(|e| e.status)
            .ok_or_else(|| {
                BillingError::not_found(Resource::Transaction, commit.transaction_id.to_string())
            })?;
        match status {
            TransactionStatus::Pending => {}
            TransactionStatus::Completed => return Ok(CommitOutcome::AlreadyCompleted),
            other => return Ok(CommitOutcome::NotPending(other)),
        }
        if !tables.accounts.contains_key(&commit.user_id) {
            return Err(BillingError::not_found(Resource::Account, commit.user_id.as_str()));
        }

        if let Some(entry) = tables.entries.get_mut(&commit.transaction_id) {
            entry.status = TransactionStatus::Completed;
            entry.gateway_payment_id = Some(commit.gateway_payment_id.clone());
            entry.gateway_signature = commit.gateway_signature.clone();
            entry.verification_method = Some(commit.verification_method);
            entry.updated_at = commit.now;
        }
        if let Some(account) = tables.accounts.get_mut(&commit.user_id) {
            account.subscription = Some(commit.subscription);
        }

        Ok(CommitOutcome::Committed)
    }
}

#[async_trait]
impl AccountRepository for InMemoryBillingStore {
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserAccount>, BillingError> {
        Ok(self.tables.read().await.accounts.get(user_id).cloned())
    }

    async fn cancel_subscription(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<SubscriptionState, BillingError> {
        let mut tables = self.tables.write().await;
        let account = tables
            .accounts
            .get_mut(user_id)
            .ok_or_else(|| BillingError::not_found(Resource::Account, user_id.as_str()))?;

        let current = account.subscription.as_ref().ok_or_else(no_active_subscription)?;
        let cancelled = current.cancel(&now)?;
        account.subscription = Some(cancelled.clone());
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{PlanCatalog, SubscriptionStatus, VerificationMethod};
    use crate::domain::foundation::PlanId;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn pending(order_id: &str) -> LedgerEntry {
        LedgerEntry::pending(
            TransactionId::new(),
            user(),
            PlanId::new("basic").unwrap(),
            order_id,
            49_900,
            "INR",
            Timestamp::now(),
        )
    }

    fn commit_for(entry: &LedgerEntry) -> ActivationCommit {
        let catalog = PlanCatalog::builtin();
        let plan = catalog.get_plan(&entry.plan_id).unwrap();
        let now = Timestamp::now();
        ActivationCommit {
            transaction_id: entry.transaction_id,
            user_id: entry.user_id.clone(),
            gateway_payment_id: "pay_1".to_string(),
            gateway_signature: None,
            verification_method: VerificationMethod::GatewayLookup,
            subscription: SubscriptionState::activate(plan, "pay_1", entry.amount_minor_units, now)
                .unwrap(),
            now,
        }
    }

    async fn store_with_account() -> InMemoryBillingStore {
        let store = InMemoryBillingStore::new();
        store
            .upsert_account(UserAccount::new(user(), "user@example.com", None))
            .await;
        store
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_order() {
        let store = store_with_account().await;
        store.insert(&pending("order_1")).await.unwrap();

        let err = store.insert(&pending("order_1")).await.unwrap_err();
        assert!(matches!(err, BillingError::Conflict { .. }));
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn find_by_order_for_user_ignores_other_users() {
        let store = store_with_account().await;
        store.insert(&pending("order_1")).await.unwrap();

        let other = UserId::new("user-2").unwrap();
        assert!(store.find_by_order_for_user("order_1", &other).await.unwrap().is_none());
        assert!(store.find_by_order_for_user("order_1", &user()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn commit_activation_writes_entry_and_subscription() {
        let store = store_with_account().await;
        let entry = pending("order_1");
        store.insert(&entry).await.unwrap();

        let outcome = store.commit_activation(commit_for(&entry)).await.unwrap();
        assert!(matches!(outcome, CommitOutcome::Committed));

        let stored = store.find_by_order("order_1").await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Completed);
        assert_eq!(stored.gateway_payment_id.as_deref(), Some("pay_1"));

        let account = store.find_by_id(&user()).await.unwrap().unwrap();
        assert!(account.has_active_subscription(&Timestamp::now()));
    }

    #[tokio::test]
    async fn second_commit_reports_already_completed() {
        let store = store_with_account().await;
        let entry = pending("order_1");
        store.insert(&entry).await.unwrap();

        store.commit_activation(commit_for(&entry)).await.unwrap();
        let outcome = store.commit_activation(commit_for(&entry)).await.unwrap();

        assert_eq!(outcome, CommitOutcome::AlreadyCompleted);
    }

    #[tokio::test]
    async fn commit_after_failure_is_not_pending() {
        let store = store_with_account().await;
        let entry = pending("order_1");
        store.insert(&entry).await.unwrap();
        assert!(store
            .mark_failed_if_pending(&entry.transaction_id, "declined", Timestamp::now())
            .await
            .unwrap());

        let outcome = store.commit_activation(commit_for(&entry)).await.unwrap();
        assert_eq!(outcome, CommitOutcome::NotPending(TransactionStatus::Failed));

        let account = store.find_by_id(&user()).await.unwrap().unwrap();
        assert!(account.subscription.is_none());
    }

    #[tokio::test]
    async fn commit_without_account_writes_nothing() {
        let store = InMemoryBillingStore::new();
        let entry = pending("order_1");
        store.insert(&entry).await.unwrap();

        assert!(store.commit_activation(commit_for(&entry)).await.is_err());
        assert_eq!(store.count_with_status(TransactionStatus::Pending).await, 1);
    }

    #[tokio::test]
    async fn mark_failed_only_once() {
        let store = store_with_account().await;
        let entry = pending("order_1");
        store.insert(&entry).await.unwrap();

        assert!(store
            .mark_failed_if_pending(&entry.transaction_id, "declined", Timestamp::now())
            .await
            .unwrap());
        assert!(!store
            .mark_failed_if_pending(&entry.transaction_id, "declined again", Timestamp::now())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn cancel_subscription_keeps_end_date() {
        let store = store_with_account().await;
        let entry = pending("order_1");
        store.insert(&entry).await.unwrap();
        let commit = commit_for(&entry);
        let end_date = commit.subscription.end_date;
        store.commit_activation(commit).await.unwrap();

        let cancelled = store.cancel_subscription(&user(), Timestamp::now()).await.unwrap();

        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        assert_eq!(cancelled.end_date, end_date);
    }

    #[tokio::test]
    async fn cancel_without_subscription_conflicts() {
        let store = store_with_account().await;
        let err = store.cancel_subscription(&user(), Timestamp::now()).await.unwrap_err();
        assert!(matches!(err, BillingError::Conflict { .. }));
    }

    #[tokio::test]
    async fn list_for_user_is_newest_first() {
        let store = store_with_account().await;
        let mut older = pending("order_old");
        older.created_at = Timestamp::now().add_days(-2);
        store.insert(&older).await.unwrap();
        store.insert(&pending("order_new")).await.unwrap();

        let entries = store.list_for_user(&user()).await.unwrap();
        assert_eq!(entries[0].gateway_order_id, "order_new");
        assert_eq!(entries[1].gateway_order_id, "order_old");
    }
}

//! Transaction ledger port.
//!
//! The ledger is the source of truth for whether an order has been paid.
//! Every status change is conditional on the entry still being `pending`, and
//! activation writes the ledger entry and the user's subscription slot in one
//! storage transaction.
//!
//! # Example
//!
//! ```ignore
//! match ledger.commit_activation(commit).await? {
//!     CommitOutcome::Committed => read_back_and_notify(),
//!     CommitOutcome::AlreadyCompleted => load_existing_subscription(),
//!     CommitOutcome::NotPending(status) => conflict(status),
//! }
//! ```

use async_trait::async_trait;

use crate::domain::billing::{BillingError, LedgerEntry, SubscriptionState, TransactionStatus, VerificationMethod};
use crate::domain::foundation::{Timestamp, TransactionId, UserId};

#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Inserts a new `pending` entry.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the gateway order id is already recorded
    /// - `Infrastructure` on persistence failure
    async fn insert(&self, entry: &LedgerEntry) -> Result<(), BillingError>;

    /// Finds the entry for an order owned by `user_id`.
    async fn find_by_order_for_user(
        &self,
        gateway_order_id: &str,
        user_id: &UserId,
    ) -> Result<Option<LedgerEntry>, BillingError>;

    /// Finds the entry for an order regardless of owner (webhook path).
    async fn find_by_order(&self, gateway_order_id: &str) -> Result<Option<LedgerEntry>, BillingError>;

    /// The user's entries, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, BillingError>;

    /// Marks the entry `failed` if, and only if, it is still `pending`.
    ///
    /// Returns true when this call made the transition.
    async fn mark_failed_if_pending(
        &self,
        transaction_id: &TransactionId,
        reason: &str,
        now: Timestamp,
    ) -> Result<bool, BillingError>;

    /// Atomically flips the entry `pending -> completed` and overwrites the
    /// owner's subscription slot. Nothing is written unless the entry was
    /// still `pending`.
    async fn commit_activation(&self, commit: ActivationCommit) -> Result<CommitOutcome, BillingError>;
}

/// Everything written by a successful activation.
#[derive(Debug, Clone)]
pub struct ActivationCommit {
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub gateway_payment_id: String,
    pub gateway_signature: Option<String>,
    pub verification_method: VerificationMethod,
    pub subscription: SubscriptionState,
    pub now: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// This call completed the entry and wrote the subscription slot. Callers
    /// read the slot back from the account store.
    Committed,
    /// Someone else completed the entry first.
    AlreadyCompleted,
    /// The entry had moved to a status other than `completed`.
    NotPending(TransactionStatus),
}

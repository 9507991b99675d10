//! PaymentVerificationEngine - the single activation procedure behind both the
//! client callback and the gateway webhook.
//!
//! Given a ledger entry and whatever evidence the caller has, the engine:
//!
//! 1. Short-circuits entries that are already `completed` (idempotent replay)
//! 2. Runs the verification chain
//! 3. Commits ledger and subscription together through `commit_activation`
//! 4. Reads the stored subscription back and checks it carries this payment
//! 5. Spawns a best-effort confirmation notification

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, LedgerEntry, PaymentEvidence, Plan, PlanCatalog, Resource, SubscriptionState,
    TransactionStatus, VerificationChain, Verdict,
};
use crate::domain::foundation::{Timestamp, TransactionId};
use crate::ports::{
    AccountRepository, ActivationCommit, CommitOutcome, NotificationSink,
    SubscriptionConfirmation, TransactionLedger,
};

/// Result of a successful (or replayed) activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub transaction_id: TransactionId,
    pub subscription: SubscriptionState,
    pub plan: Plan,
    /// True when the entry was already completed and nothing was written.
    pub replayed: bool,
    /// True on replay when the account's subscription was activated by a
    /// later payment than this entry's.
    pub superseded: bool,
}

pub struct PaymentVerificationEngine {
    ledger: Arc<dyn TransactionLedger>,
    accounts: Arc<dyn AccountRepository>,
    catalog: Arc<PlanCatalog>,
    chain: Arc<VerificationChain>,
    notifier: Arc<dyn NotificationSink>,
}

impl PaymentVerificationEngine {
    pub fn new(
        ledger: Arc<dyn TransactionLedger>,
        accounts: Arc<dyn AccountRepository>,
        catalog: Arc<PlanCatalog>,
        chain: Arc<VerificationChain>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            ledger,
            accounts,
            catalog,
            chain,
            notifier,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn TransactionLedger> {
        &self.ledger
    }

    /// Verifies the payment behind `entry` and activates the subscription.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the entry is failed or refunded
    /// - `VerificationFailed` if no step proved the payment
    /// - `UpstreamUnavailable` if the gateway could not be consulted
    /// - `InconsistentState` if the stored subscription is not the active one
    ///   this payment wrote
    pub async fn process(
        &self,
        entry: LedgerEntry,
        evidence: PaymentEvidence,
    ) -> Result<Activation, BillingError> {
        match entry.status {
            TransactionStatus::Completed => return self.replay(&entry).await,
            TransactionStatus::Failed | TransactionStatus::Refunded => {
                return Err(not_pending(entry.status));
            }
            TransactionStatus::Pending => {}
        }

        let plan = self.catalog.get_plan(&entry.plan_id)?.clone();

        let (payment_id, method) = match self.chain.run(&evidence).await {
            Verdict::Verified { payment_id, method } => (payment_id, method),
            Verdict::Pending(reason) => {
                tracing::info!(
                    order_id = %entry.gateway_order_id,
                    reason = %reason,
                    "Payment not captured yet; entry left pending"
                );
                return Err(BillingError::verification_failed(format!(
                    "Payment is not captured yet ({reason}); retry shortly"
                )));
            }
            Verdict::Unavailable(reason) => {
                return Err(BillingError::upstream_unavailable(reason));
            }
            Verdict::Rejected(reason) if evidence.authenticated => {
                return self.reject(&entry, reason).await;
            }
            Verdict::Rejected(reason) => {
                tracing::warn!(
                    order_id = %entry.gateway_order_id,
                    reason = %reason,
                    "Unauthenticated evidence rejected; entry left pending"
                );
                return Err(BillingError::verification_failed(reason));
            }
        };

        let now = Timestamp::now();
        let subscription =
            SubscriptionState::activate(&plan, payment_id.clone(), entry.amount_minor_units, now)?;

        let outcome = self
            .ledger
            .commit_activation(ActivationCommit {
                transaction_id: entry.transaction_id,
                user_id: entry.user_id.clone(),
                gateway_payment_id: payment_id.clone(),
                gateway_signature: evidence.client_signature.clone(),
                verification_method: method,
                subscription,
                now,
            })
            .await?;

        match outcome {
            CommitOutcome::Committed => {}
            CommitOutcome::AlreadyCompleted => {
                let completed = self
                    .ledger
                    .find_by_order(&entry.gateway_order_id)
                    .await?
                    .unwrap_or(entry);
                return self.replay(&completed).await;
            }
            CommitOutcome::NotPending(status) => return Err(not_pending(status)),
        }

        let stored = self.read_back(&entry, &payment_id, now).await?;

        tracing::info!(
            transaction_id = %entry.transaction_id,
            user_id = %entry.user_id,
            plan_id = %plan.plan_id,
            method = method.as_str(),
            end_date = %stored.end_date.as_datetime(),
            "Subscription activated"
        );

        self.spawn_confirmation(&entry, &plan, &stored);

        Ok(Activation {
            transaction_id: entry.transaction_id,
            subscription: stored,
            plan,
            replayed: false,
            superseded: false,
        })
    }

    /// Loads the subscription the commit wrote and checks it is active and
    /// carries this payment.
    async fn read_back(
        &self,
        entry: &LedgerEntry,
        payment_id: &str,
        now: Timestamp,
    ) -> Result<SubscriptionState, BillingError> {
        let stored = self
            .accounts
            .find_by_id(&entry.user_id)
            .await?
            .and_then(|account| account.subscription);

        match stored {
            Some(subscription)
                if subscription.has_active_subscription(&now)
                    && subscription.activation_reference == payment_id =>
            {
                Ok(subscription)
            }
            other => {
                tracing::error!(
                    transaction_id = %entry.transaction_id,
                    user_id = %entry.user_id,
                    payment_id = %payment_id,
                    stored_reference = other.as_ref().map(|s| s.activation_reference.as_str()),
                    stored_status = other.as_ref().map(|s| s.status.as_str()),
                    "Committed activation does not yield an active subscription"
                );
                Err(BillingError::inconsistent_state(format!(
                    "Transaction {} completed but subscription is not active",
                    entry.transaction_id
                )))
            }
        }
    }

    /// Idempotent path: the order was paid earlier, return what is stored.
    async fn replay(&self, entry: &LedgerEntry) -> Result<Activation, BillingError> {
        tracing::debug!(
            transaction_id = %entry.transaction_id,
            order_id = %entry.gateway_order_id,
            "Order already completed; returning stored subscription"
        );

        let plan = self.catalog.get_plan(&entry.plan_id)?.clone();
        let subscription = self
            .accounts
            .find_by_id(&entry.user_id)
            .await?
            .and_then(|account| account.subscription)
            .ok_or_else(|| {
                tracing::error!(
                    transaction_id = %entry.transaction_id,
                    user_id = %entry.user_id,
                    "Completed transaction has no subscription on the account"
                );
                BillingError::inconsistent_state(format!(
                    "Transaction {} is completed but the account has no subscription",
                    entry.transaction_id
                ))
            })?;

        let superseded =
            entry.gateway_payment_id.as_deref() != Some(subscription.activation_reference.as_str());
        if superseded {
            tracing::debug!(
                transaction_id = %entry.transaction_id,
                current_reference = %subscription.activation_reference,
                "Account subscription comes from a later payment"
            );
        }

        Ok(Activation {
            transaction_id: entry.transaction_id,
            subscription,
            plan,
            replayed: true,
            superseded,
        })
    }

    async fn reject<T>(&self, entry: &LedgerEntry, reason: String) -> Result<T, BillingError> {
        let marked = self
            .ledger
            .mark_failed_if_pending(&entry.transaction_id, &reason, Timestamp::now())
            .await?;

        if marked {
            tracing::warn!(
                transaction_id = %entry.transaction_id,
                order_id = %entry.gateway_order_id,
                reason = %reason,
                "Payment verification failed; entry marked failed"
            );
        } else {
            tracing::debug!(
                transaction_id = %entry.transaction_id,
                "Entry left pending state before it could be marked failed"
            );
        }

        Err(BillingError::verification_failed(reason))
    }

    fn spawn_confirmation(&self, entry: &LedgerEntry, plan: &Plan, subscription: &SubscriptionState) {
        let accounts = Arc::clone(&self.accounts);
        let notifier = Arc::clone(&self.notifier);
        let user_id = entry.user_id.clone();
        let transaction_id = entry.transaction_id;
        let plan_name = plan.display_name.clone();
        let amount = entry.amount_minor_units;
        let currency = entry.currency.clone();
        let valid_until = subscription.end_date;
        let reference = subscription.activation_reference.clone();

        tokio::spawn(async move {
            let account = match accounts.find_by_id(&user_id).await {
                Ok(Some(account)) => account,
                Ok(None) => {
                    tracing::warn!(user_id = %user_id, "No account to notify after activation");
                    return;
                }
                Err(err) => {
                    tracing::warn!(user_id = %user_id, error = %err, "Could not load account for notification");
                    return;
                }
            };

            let confirmation = SubscriptionConfirmation {
                recipient_email: account.email.clone(),
                recipient_name: account.greeting_name().to_string(),
                plan_name,
                amount_minor_units: amount,
                currency,
                valid_until,
                transaction_reference: reference,
            };

            if let Err(err) = notifier.send_subscription_confirmation(&confirmation).await {
                tracing::warn!(
                    transaction_id = %transaction_id,
                    error = %err,
                    "Subscription confirmation not delivered"
                );
            }
        });
    }
}

fn not_pending(status: TransactionStatus) -> BillingError {
    BillingError::conflict(
        Resource::Transaction,
        format!("Transaction is {}; create a new order", status.as_str()),
    )
}

//! Account repository port.
//!
//! Billing reads accounts for contact details and owns only the embedded
//! subscription slot. Activation writes the slot through
//! `TransactionLedger::commit_activation`; cancellation goes through here.

use async_trait::async_trait;

use crate::domain::billing::{BillingError, SubscriptionState, UserAccount};
use crate::domain::foundation::{Timestamp, UserId};

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Returns `None` if the user has no account.
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserAccount>, BillingError>;

    /// Sets the subscription status to `cancelled` in one conditional write,
    /// provided it is active at `now`. The end date is left untouched.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the account does not exist
    /// - `Conflict` if there is no active subscription
    async fn cancel_subscription(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<SubscriptionState, BillingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn AccountRepository) {}
    }
}

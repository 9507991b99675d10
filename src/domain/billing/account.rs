//! User account as seen by billing.

use serde::Serialize;

use super::SubscriptionState;
use crate::domain::foundation::{Timestamp, UserId};

/// Registration owns everything here except `subscription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAccount {
    pub user_id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub subscription: Option<SubscriptionState>,
}

impl UserAccount {
    pub fn new(user_id: UserId, email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            display_name,
            subscription: None,
        }
    }

    pub fn has_active_subscription(&self, now: &Timestamp) -> bool {
        super::subscription::has_active_subscription(self.subscription.as_ref(), now)
    }

    pub fn greeting_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

//! Per-user subscription slot.
//!
//! A `SubscriptionState` is a value object: activation replaces it wholesale and
//! cancellation produces a new value. Whether it grants access is always
//! recomputed against the clock; the stored status is advisory.

use serde::{Deserialize, Serialize};

use super::{BillingError, Plan, Resource};
use crate::domain::foundation::{PlanId, StateMachine, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "expired" => Some(SubscriptionStatus::Expired),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            _ => None,
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!((self, target), (Active, Cancelled) | (Active, Expired))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Active => vec![Cancelled, Expired],
            Expired | Cancelled => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionState {
    pub plan_id: PlanId,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub status: SubscriptionStatus,
    /// Gateway payment id that paid for this period.
    pub activation_reference: String,
    pub amount_paid: i64,
}

impl SubscriptionState {
    /// Builds the state written on successful payment: active from `now`
    /// until the plan's period end.
    pub fn activate(
        plan: &Plan,
        payment_id: impl Into<String>,
        amount_paid: i64,
        now: Timestamp,
    ) -> Result<Self, BillingError> {
        Ok(Self {
            plan_id: plan.plan_id.clone(),
            start_date: now,
            end_date: plan.period_end(now)?,
            status: SubscriptionStatus::Active,
            activation_reference: payment_id.into(),
            amount_paid,
        })
    }

    /// True when the stored status is active and the window has not closed.
    pub fn has_active_subscription(&self, now: &Timestamp) -> bool {
        self.status == SubscriptionStatus::Active && self.end_date.is_after(now)
    }

    /// Status as observed at `now`: an active slot past its end reads as expired.
    pub fn effective_status(&self, now: &Timestamp) -> SubscriptionStatus {
        match self.status {
            SubscriptionStatus::Active if !self.end_date.is_after(now) => {
                SubscriptionStatus::Expired
            }
            other => other,
        }
    }

    /// Cancels an active subscription, keeping its end date.
    pub fn cancel(&self, now: &Timestamp) -> Result<Self, BillingError> {
        if !self.has_active_subscription(now) {
            return Err(no_active_subscription());
        }
        let status = self
            .status
            .transition_to(SubscriptionStatus::Cancelled)
            .map_err(BillingError::from)?;
        Ok(Self {
            status,
            ..self.clone()
        })
    }
}

/// Recomputed activity over an optional slot.
pub fn has_active_subscription(slot: Option<&SubscriptionState>, now: &Timestamp) -> bool {
    slot.map(|s| s.has_active_subscription(now)).unwrap_or(false)
}

pub(crate) fn no_active_subscription() -> BillingError {
    BillingError::conflict(Resource::Account, "No active subscription to cancel")
}

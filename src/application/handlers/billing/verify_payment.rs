//! VerifyPaymentHandler - client-reported checkout completion.

use std::sync::Arc;

use super::verification_engine::{Activation, PaymentVerificationEngine};
use crate::domain::billing::{BillingError, PaymentEvidence, Resource};
use crate::domain::foundation::{PlanId, UserId};

#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub user_id: UserId,
    pub order_id: String,
    pub payment_id: String,
    pub signature: Option<String>,
    /// Must match the plan recorded on the order.
    pub plan_id: PlanId,
}

pub struct VerifyPaymentHandler {
    engine: Arc<PaymentVerificationEngine>,
}

impl VerifyPaymentHandler {
    pub fn new(engine: Arc<PaymentVerificationEngine>) -> Self {
        Self { engine }
    }

    pub async fn handle(&self, cmd: VerifyPaymentCommand) -> Result<Activation, BillingError> {
        let order_id = cmd.order_id.trim();
        let payment_id = cmd.payment_id.trim();
        if order_id.is_empty() {
            return Err(BillingError::validation("order_id", "must not be empty"));
        }
        if payment_id.is_empty() {
            return Err(BillingError::validation("payment_id", "must not be empty"));
        }

        let entry = self
            .engine
            .ledger()
            .find_by_order_for_user(order_id, &cmd.user_id)
            .await?
            .ok_or_else(|| BillingError::not_found(Resource::Transaction, order_id))?;

        if entry.plan_id != cmd.plan_id {
            return Err(BillingError::validation(
                "plan_id",
                format!("order {} was created for plan {}", order_id, entry.plan_id),
            ));
        }

        self.engine
            .process(
                entry,
                PaymentEvidence::from_client(order_id, payment_id, cmd.signature),
            )
            .await
    }
}

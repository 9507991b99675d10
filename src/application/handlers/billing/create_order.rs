//! CreateOrderHandler - opens a checkout attempt for a plan.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::billing::{BillingError, LedgerEntry, Plan, PlanCatalog, Resource};
use crate::domain::foundation::{PlanId, Timestamp, TransactionId, UserId};
use crate::ports::{AccountRepository, CreateOrderRequest, GatewayOrder, PaymentGateway, TransactionLedger};

#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub user_id: UserId,
    pub plan_id: PlanId,
}

#[derive(Debug, Clone)]
pub struct CreateOrderResult {
    pub transaction_id: TransactionId,
    pub order: GatewayOrder,
    pub plan: Plan,
}

pub struct CreateOrderHandler {
    ledger: Arc<dyn TransactionLedger>,
    accounts: Arc<dyn AccountRepository>,
    gateway: Arc<dyn PaymentGateway>,
    catalog: Arc<PlanCatalog>,
}

impl CreateOrderHandler {
    pub fn new(
        ledger: Arc<dyn TransactionLedger>,
        accounts: Arc<dyn AccountRepository>,
        gateway: Arc<dyn PaymentGateway>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        Self {
            ledger,
            accounts,
            gateway,
            catalog,
        }
    }

    pub async fn handle(&self, cmd: CreateOrderCommand) -> Result<CreateOrderResult, BillingError> {
        // 1. Plan must exist
        let plan = self.catalog.get_plan(&cmd.plan_id)?.clone();

        // 2. Account must exist and have no live subscription
        let account = self
            .accounts
            .find_by_id(&cmd.user_id)
            .await?
            .ok_or_else(|| BillingError::not_found(Resource::Account, cmd.user_id.as_str()))?;

        let now = Timestamp::now();
        if account.has_active_subscription(&now) {
            return Err(BillingError::conflict(
                Resource::Account,
                "An active subscription already exists",
            ));
        }

        // 3. Create the order at the gateway
        let transaction_id = TransactionId::new();
        let request = CreateOrderRequest {
            amount_minor_units: plan.price_minor_units,
            currency: plan.currency.clone(),
            receipt: receipt_for(&transaction_id),
            notes: HashMap::from([
                ("user_id".to_string(), cmd.user_id.to_string()),
                ("plan_id".to_string(), plan.plan_id.to_string()),
                ("transaction_id".to_string(), transaction_id.to_string()),
            ]),
        };

        let order = self.gateway.create_order(request).await.map_err(|e| {
            tracing::warn!(
                user_id = %cmd.user_id,
                plan_id = %plan.plan_id,
                error = %e,
                "Gateway order creation failed"
            );
            BillingError::upstream_unavailable(e.message)
        })?;

        // 4. Record the pending entry
        let entry = LedgerEntry::pending(
            transaction_id,
            cmd.user_id.clone(),
            plan.plan_id.clone(),
            order.order_id.clone(),
            plan.price_minor_units,
            plan.currency.clone(),
            now,
        );
        self.ledger.insert(&entry).await?;

        tracing::info!(
            transaction_id = %transaction_id,
            order_id = %order.order_id,
            user_id = %cmd.user_id,
            plan_id = %plan.plan_id,
            "Order created"
        );

        Ok(CreateOrderResult {
            transaction_id,
            order,
            plan,
        })
    }
}

/// `rcpt_` plus the transaction id without hyphens: 37 characters.
fn receipt_for(transaction_id: &TransactionId) -> String {
    format!("rcpt_{}", transaction_id.as_uuid().simple())
}

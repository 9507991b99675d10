//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, create_order, get_plan, get_subscription, handle_payment_webhook,
    list_plans, list_transactions, verify_payment, BillingAppState,
};

/// Billing API routes, mounted at `/api/billing`.
///
/// # Routes
///
/// ## Public
/// - `GET /plans` - List plans
/// - `GET /plans/:plan_id` - One plan
///
/// ## User Endpoints (require authentication)
/// - `POST /orders` - Open a checkout order
/// - `POST /verify` - Confirm a finished checkout
/// - `GET /subscription` - Current subscription
/// - `POST /subscription/cancel` - Cancel
/// - `GET /transactions` - Ledger history
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/plans/:plan_id", get(get_plan))
        .route("/orders", post(create_order))
        .route("/verify", post(verify_payment))
        .route("/subscription", get(get_subscription))
        .route("/subscription/cancel", post(cancel_subscription))
        .route("/transactions", get(list_transactions))
}

/// Gateway webhook routes, mounted at `/api/webhooks`.
///
/// Authenticated by body signature, not by bearer token.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/payments", post(handle_payment_webhook))
}

/// Billing and webhook routes, suitable for mounting at `/api`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/billing", billing_routes())
        .nest("/webhooks", webhook_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::http::billing::{BillingPorts, BillingSettings};
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::adapters::notification::RecordingNotifier;
    use crate::domain::billing::{PlanCatalog, RetryPolicy};
    use secrecy::Secret;

    fn test_state() -> BillingAppState {
        let store = InMemoryBillingStore::new();
        BillingAppState::new(
            BillingPorts {
                catalog: Arc::new(PlanCatalog::builtin()),
                ledger: Arc::new(store.clone()),
                accounts: Arc::new(store),
                gateway: Arc::new(MockPaymentGateway::new()),
                notifier: Arc::new(RecordingNotifier::new()),
            },
            BillingSettings {
                key_id: "rzp_test_key".to_string(),
                key_secret: Secret::new("secret".to_string()),
                webhook_secret: None,
                lookup_retry: RetryPolicy::none(),
            },
        )
    }

    #[test]
    fn billing_routes_creates_router() {
        let _: Router<()> = billing_routes().with_state(test_state());
    }

    #[test]
    fn webhook_routes_creates_router() {
        let _: Router<()> = webhook_routes().with_state(test_state());
    }

    #[test]
    fn billing_router_creates_combined_router() {
        let _: Router<()> = billing_router().with_state(test_state());
    }
}

//! End-to-end billing flows through the application layer.
//!
//! Wires `BillingAppState` over the in-memory store, the mock gateway and a
//! recording notifier, then drives checkout, verification, webhooks and
//! cancellation the way the HTTP layer does.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use secrecy::Secret;
use serde_json::json;

use bizhub::adapters::gateway::MockPaymentGateway;
use bizhub::adapters::http::billing::{BillingAppState, BillingPorts, BillingSettings};
use bizhub::adapters::memory::InMemoryBillingStore;
use bizhub::adapters::notification::RecordingNotifier;
use bizhub::application::{
    CancelSubscriptionCommand, CreateOrderCommand, CreateOrderResult, HandleGatewayWebhookCommand,
    VerifyPaymentCommand, WebhookOutcome,
};
use bizhub::domain::billing::signature::{payment_signature_message, sign};
use bizhub::domain::billing::{
    BillingError, GatewayPayment, PlanCatalog, RetryPolicy, SubscriptionState, SubscriptionStatus,
    TransactionStatus, UserAccount, VerificationMethod,
};
use bizhub::domain::foundation::{PlanId, Timestamp, UserId};
use bizhub::ports::TransactionLedger;

const KEY_SECRET: &str = "flow_key_secret";
const WEBHOOK_SECRET: &str = "flow_webhook_secret";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    store: InMemoryBillingStore,
    gateway: MockPaymentGateway,
    notifier: RecordingNotifier,
    state: BillingAppState,
}

impl Harness {
    async fn new() -> Self {
        let store = InMemoryBillingStore::new();
        let gateway = MockPaymentGateway::new();
        let notifier = RecordingNotifier::new();

        store
            .upsert_account(UserAccount::new(
                user(),
                "owner@shop.example",
                Some("Asha".to_string()),
            ))
            .await;

        let state = BillingAppState::new(
            BillingPorts {
                catalog: Arc::new(PlanCatalog::builtin()),
                ledger: Arc::new(store.clone()),
                accounts: Arc::new(store.clone()),
                gateway: Arc::new(gateway.clone()),
                notifier: Arc::new(notifier.clone()),
            },
            BillingSettings {
                key_id: "rzp_test_flow".to_string(),
                key_secret: Secret::new(KEY_SECRET.to_string()),
                webhook_secret: Some(Secret::new(WEBHOOK_SECRET.to_string())),
                lookup_retry: RetryPolicy::new(2, Duration::from_millis(1)),
            },
        );

        Self {
            store,
            gateway,
            notifier,
            state,
        }
    }

    async fn order(&self, plan: &str) -> CreateOrderResult {
        self.state
            .create_order_handler()
            .handle(CreateOrderCommand {
                user_id: user(),
                plan_id: PlanId::new(plan).unwrap(),
            })
            .await
            .unwrap()
    }

    fn verify_command(&self, order_id: &str, payment_id: &str, signature: Option<String>) -> VerifyPaymentCommand {
        VerifyPaymentCommand {
            user_id: user(),
            order_id: order_id.to_string(),
            payment_id: payment_id.to_string(),
            signature,
            plan_id: PlanId::new("basic").unwrap(),
        }
    }

    async fn status_of(&self, order_id: &str) -> TransactionStatus {
        self.store.find_by_order(order_id).await.unwrap().unwrap().status
    }
}

fn user() -> UserId {
    UserId::new("merchant-1").unwrap()
}

fn client_signature(order_id: &str, payment_id: &str) -> Option<String> {
    Some(sign(
        KEY_SECRET.as_bytes(),
        payment_signature_message(order_id, payment_id).as_bytes(),
    ))
}

fn payment(id: &str, order_id: &str, status: &str) -> GatewayPayment {
    GatewayPayment {
        id: id.to_string(),
        order_id: Some(order_id.to_string()),
        status: status.to_string(),
        amount: Some(49_900),
        currency: Some("INR".to_string()),
        error_description: None,
    }
}

fn signed_webhook(event: &str, payment_id: &str, order_id: &str, status: &str) -> HandleGatewayWebhookCommand {
    let payload = json!({
        "event": event,
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": order_id,
                    "status": status,
                    "amount": 49_900,
                    "currency": "INR"
                }
            }
        }
    })
    .to_string()
    .into_bytes();
    let signature = Some(sign(WEBHOOK_SECRET.as_bytes(), &payload));
    HandleGatewayWebhookCommand { payload, signature }
}

/// Lets spawned confirmation sends finish.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// =============================================================================
// Client verification
// =============================================================================

#[tokio::test]
async fn signed_checkout_activates_once_and_repeats_are_idempotent() {
    let h = Harness::new().await;
    let order = h.order("basic").await;
    let order_id = order.order.order_id.clone();
    let cmd = h.verify_command(&order_id, "pay_1", client_signature(&order_id, "pay_1"));

    let first = h.state.verify_payment_handler().handle(cmd.clone()).await.unwrap();
    let second = h.state.verify_payment_handler().handle(cmd).await.unwrap();
    settle().await;

    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(first.subscription, second.subscription);
    assert_eq!(first.subscription.status, SubscriptionStatus::Active);
    assert_eq!(h.status_of(&order_id).await, TransactionStatus::Completed);
    assert_eq!(h.notifier.count(), 1);
    assert_eq!(h.gateway.fetch_calls() + h.gateway.list_calls(), 0);
}

#[tokio::test]
async fn missing_signature_is_verified_through_gateway_lookup() {
    let h = Harness::new().await;
    let order = h.order("basic").await;
    let order_id = order.order.order_id.clone();
    h.gateway.add_payment(payment("pay_2", &order_id, "captured"));

    let activation = h
        .state
        .verify_payment_handler()
        .handle(h.verify_command(&order_id, "pay_2", None))
        .await
        .unwrap();

    assert_eq!(activation.subscription.activation_reference, "pay_2");
    let entry = h.store.find_by_order(&order_id).await.unwrap().unwrap();
    assert_eq!(entry.verification_method, Some(VerificationMethod::GatewayLookup));
}

#[tokio::test]
async fn uncaptured_payment_is_not_activated() {
    let h = Harness::new().await;
    let order = h.order("basic").await;
    let order_id = order.order.order_id.clone();
    h.gateway.add_payment(payment("pay_3", &order_id, "authorized"));

    let err = h
        .state
        .verify_payment_handler()
        .handle(h.verify_command(&order_id, "pay_3", None))
        .await
        .unwrap_err();

    assert!(matches!(err, BillingError::VerificationFailed { .. }));
    assert_eq!(h.status_of(&order_id).await, TransactionStatus::Pending);
}

#[tokio::test]
async fn payment_for_another_order_fails_the_entry() {
    let h = Harness::new().await;
    let order = h.order("basic").await;
    let order_id = order.order.order_id.clone();
    h.gateway.add_payment(payment("pay_4", "order_someone_else", "captured"));

    let err = h
        .state
        .verify_payment_handler()
        .handle(h.verify_command(&order_id, "pay_4", None))
        .await
        .unwrap_err();

    assert!(matches!(err, BillingError::VerificationFailed { .. }));
    assert_eq!(h.status_of(&order_id).await, TransactionStatus::Failed);
    assert_eq!(h.store.count_with_status(TransactionStatus::Completed).await, 0);
}

// =============================================================================
// Webhooks
// =============================================================================

#[tokio::test]
async fn client_call_after_webhook_keeps_end_date() {
    let h = Harness::new().await;
    let order = h.order("basic").await;
    let order_id = order.order.order_id.clone();

    let outcome = h
        .state
        .webhook
        .handle(signed_webhook("payment.captured", "pay_5", &order_id, "captured"))
        .await
        .unwrap();
    assert!(matches!(outcome, WebhookOutcome::Activated { .. }));

    let entry = h.store.find_by_order(&order_id).await.unwrap().unwrap();
    let after_webhook = h.state.get_subscription_handler().handle(&user()).await.unwrap();

    let activation = h
        .state
        .verify_payment_handler()
        .handle(h.verify_command(&order_id, "pay_5", client_signature(&order_id, "pay_5")))
        .await
        .unwrap();
    settle().await;

    assert!(activation.replayed);
    assert_eq!(
        Some(activation.subscription.end_date),
        after_webhook.subscription.map(|s| s.end_date)
    );
    assert_eq!(entry.verification_method, Some(VerificationMethod::WebhookSignature));
    assert_eq!(h.notifier.count(), 1);
}

#[tokio::test]
async fn failed_payment_webhook_marks_entry_failed() {
    let h = Harness::new().await;
    let order = h.order("basic").await;
    let order_id = order.order.order_id.clone();

    let outcome = h
        .state
        .webhook
        .handle(signed_webhook("payment.failed", "pay_6", &order_id, "failed"))
        .await
        .unwrap();

    assert!(matches!(outcome, WebhookOutcome::MarkedFailed { .. }));
    assert_eq!(h.status_of(&order_id).await, TransactionStatus::Failed);
}

#[tokio::test]
async fn tampered_webhook_is_rejected_without_side_effects() {
    let h = Harness::new().await;
    let order = h.order("basic").await;
    let order_id = order.order.order_id.clone();
    let mut cmd = signed_webhook("payment.captured", "pay_7", &order_id, "captured");
    cmd.payload.extend_from_slice(b" ");

    let err = h.state.webhook.handle(cmd).await.unwrap_err();

    assert!(matches!(err, BillingError::InvalidWebhookSignature));
    assert_eq!(h.status_of(&order_id).await, TransactionStatus::Pending);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_client_and_webhook_activate_exactly_once() {
    for _ in 0..20 {
        let h = Harness::new().await;
        let order = h.order("basic").await;
        let order_id = order.order.order_id.clone();

        let verify = h.state.verify_payment_handler();
        let cmd = h.verify_command(&order_id, "pay_8", client_signature(&order_id, "pay_8"));
        let webhook = Arc::clone(&h.state.webhook);
        let event = signed_webhook("payment.captured", "pay_8", &order_id, "captured");

        let (client, hook) = tokio::join!(
            tokio::spawn(async move { verify.handle(cmd).await }),
            tokio::spawn(async move { webhook.handle(event).await }),
        );
        settle().await;

        let client = client.unwrap().unwrap();
        let hook = hook.unwrap().unwrap();

        let activations = usize::from(!client.replayed)
            + usize::from(matches!(hook, WebhookOutcome::Activated { .. }));
        assert_eq!(activations, 1);
        assert_eq!(h.store.count_with_status(TransactionStatus::Completed).await, 1);
        assert_eq!(h.store.entry_count().await, 1);
        assert!(h.notifier.count() <= 1);
    }
}

// =============================================================================
// Orders and cancellation
// =============================================================================

#[tokio::test]
async fn active_subscriber_cannot_open_another_order() {
    let h = Harness::new().await;
    let order = h.order("basic").await;
    let order_id = order.order.order_id.clone();
    h.state
        .verify_payment_handler()
        .handle(h.verify_command(&order_id, "pay_9", client_signature(&order_id, "pay_9")))
        .await
        .unwrap();

    let err = h
        .state
        .create_order_handler()
        .handle(CreateOrderCommand {
            user_id: user(),
            plan_id: PlanId::new("premium").unwrap(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, BillingError::Conflict { .. }));
    assert_eq!(h.store.entry_count().await, 1);
}

#[tokio::test]
async fn cancel_keeps_end_date_and_deactivates() {
    let h = Harness::new().await;
    let order = h.order("basic").await;
    let order_id = order.order.order_id.clone();
    let activation = h
        .state
        .verify_payment_handler()
        .handle(h.verify_command(&order_id, "pay_10", client_signature(&order_id, "pay_10")))
        .await
        .unwrap();

    let cancelled = h
        .state
        .cancel_subscription_handler()
        .handle(CancelSubscriptionCommand { user_id: user() })
        .await
        .unwrap();
    let view = h.state.get_subscription_handler().handle(&user()).await.unwrap();

    assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
    assert_eq!(cancelled.end_date, activation.subscription.end_date);
    assert!(!view.has_active_subscription);
}

#[tokio::test]
async fn transactions_are_listed_for_the_owner() {
    let h = Harness::new().await;
    h.order("basic").await;
    h.order("standard").await;

    let entries = h.state.list_transactions_handler().handle(&user()).await.unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.status == TransactionStatus::Pending));
}

// =============================================================================
// Period arithmetic
// =============================================================================

#[test]
fn monthly_plan_ends_at_end_of_day_one_month_later() {
    let plan = PlanCatalog::builtin()
        .get_plan(&PlanId::new("basic").unwrap())
        .unwrap()
        .clone();
    let start = Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap());

    let state = SubscriptionState::activate(&plan, "pay_x", plan.price_minor_units, start).unwrap();

    assert_eq!(
        state.end_date.as_datetime().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "2024-02-15T23:59:59.999Z"
    );
}

//! HTTP integration tests for the billing API.
//!
//! Drives the full `app_router` (auth middleware, routing, error mapping)
//! with `tower::ServiceExt::oneshot` over in-memory adapters.

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{header, Request, StatusCode};
use secrecy::Secret;
use serde_json::{json, Value};
use tower::ServiceExt;

use bizhub::adapters::auth::MockSessionValidator;
use bizhub::adapters::gateway::MockPaymentGateway;
use bizhub::adapters::http::billing::{
    BillingAppState, BillingPorts, BillingSettings, WEBHOOK_SIGNATURE_HEADER,
};
use bizhub::adapters::http::middleware::AuthState;
use bizhub::adapters::http::{app_router, HttpSettings};
use bizhub::adapters::memory::InMemoryBillingStore;
use bizhub::adapters::notification::RecordingNotifier;
use bizhub::domain::billing::signature::{payment_signature_message, sign};
use bizhub::domain::billing::{PlanCatalog, RetryPolicy, TransactionStatus, UserAccount};
use bizhub::domain::foundation::UserId;

const KEY_SECRET: &str = "http_key_secret";
const WEBHOOK_SECRET: &str = "http_webhook_secret";
const TOKEN: &str = "token-merchant";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    store: InMemoryBillingStore,
}

async fn test_app() -> TestApp {
    let store = InMemoryBillingStore::new();
    store
        .upsert_account(UserAccount::new(
            UserId::new("merchant-1").unwrap(),
            "merchant-1@test.example.com",
            None,
        ))
        .await;

    let state = BillingAppState::new(
        BillingPorts {
            catalog: Arc::new(PlanCatalog::builtin()),
            ledger: Arc::new(store.clone()),
            accounts: Arc::new(store.clone()),
            gateway: Arc::new(MockPaymentGateway::new()),
            notifier: Arc::new(RecordingNotifier::new()),
        },
        BillingSettings {
            key_id: "rzp_test_http".to_string(),
            key_secret: Secret::new(KEY_SECRET.to_string()),
            webhook_secret: Some(Secret::new(WEBHOOK_SECRET.to_string())),
            lookup_retry: RetryPolicy::none(),
        },
    );
    let validator: AuthState =
        Arc::new(MockSessionValidator::new().with_test_user(TOKEN, "merchant-1"));

    TestApp {
        router: app_router(state, validator, &HttpSettings::default()),
        store,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn open_order(&self) -> String {
        let (status, body) = self
            .post("/api/billing/orders", Some(TOKEN), json!({"plan_id": "basic"}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["order_id"].as_str().unwrap().to_string()
    }
}

fn client_signature(order_id: &str, payment_id: &str) -> String {
    sign(
        KEY_SECRET.as_bytes(),
        payment_signature_message(order_id, payment_id).as_bytes(),
    )
}

// =============================================================================
// Public endpoints
// =============================================================================

#[tokio::test]
async fn health_is_public() {
    let app = test_app().await;

    let (status, body) = app.get("/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn plans_are_listed_without_authentication() {
    let app = test_app().await;

    let (status, body) = app.get("/api/billing/plans", None).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["plans"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["plan_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["basic", "standard", "premium"]);
}

#[tokio::test]
async fn unknown_plan_is_404_with_code() {
    let app = test_app().await;

    let (status, body) = app.get("/api/billing/plans/gold", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PLAN_NOT_FOUND");
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn order_requires_authentication() {
    let app = test_app().await;

    let (status, _) = app
        .post("/api/billing/orders", None, json!({"plan_id": "basic"}))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.entry_count().await, 0);
}

#[tokio::test]
async fn order_returns_checkout_details() {
    let app = test_app().await;

    let (status, body) = app
        .post("/api/billing/orders", Some(TOKEN), json!({"plan_id": "basic"}))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["amount"], 49_900);
    assert_eq!(body["currency"], "INR");
    assert_eq!(body["key_id"], "rzp_test_http");
    assert!(body["order_id"].as_str().unwrap().starts_with("order_"));
}

#[tokio::test]
async fn verify_with_gateway_field_names_activates_subscription() {
    let app = test_app().await;
    let order_id = app.open_order().await;

    let (status, body) = app
        .post(
            "/api/billing/verify",
            Some(TOKEN),
            json!({
                "razorpay_order_id": order_id,
                "razorpay_payment_id": "pay_http_1",
                "razorpay_signature": client_signature(&order_id, "pay_http_1"),
                "plan_id": "basic"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscription"]["status"], "active");
    assert_eq!(body["already_processed"], false);

    let (status, body) = app.get("/api/billing/subscription", Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_active_subscription"], true);
}

#[tokio::test]
async fn forged_signature_is_400() {
    let app = test_app().await;
    let order_id = app.open_order().await;

    let (status, body) = app
        .post(
            "/api/billing/verify",
            Some(TOKEN),
            json!({
                "order_id": order_id,
                "payment_id": "pay_http_2",
                "signature": "00ff",
                "plan_id": "basic"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PAYMENT_VERIFICATION_FAILED");
    assert_eq!(app.store.count_with_status(TransactionStatus::Completed).await, 0);
}

#[tokio::test]
async fn second_order_while_active_is_409() {
    let app = test_app().await;
    let order_id = app.open_order().await;
    app.post(
        "/api/billing/verify",
        Some(TOKEN),
        json!({
            "order_id": order_id,
            "payment_id": "pay_http_3",
            "signature": client_signature(&order_id, "pay_http_3"),
            "plan_id": "basic"
        }),
    )
    .await;

    let (status, _) = app
        .post("/api/billing/orders", Some(TOKEN), json!({"plan_id": "premium"}))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.store.entry_count().await, 1);
}

#[tokio::test]
async fn cancel_without_subscription_is_409() {
    let app = test_app().await;

    let (status, _) = app
        .post("/api/billing/subscription/cancel", Some(TOKEN), json!({}))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

// =============================================================================
// Webhooks
// =============================================================================

#[tokio::test]
async fn webhook_without_valid_signature_is_401() {
    let app = test_app().await;
    let order_id = app.open_order().await;
    let body = json!({
        "event": "payment.captured",
        "payload": {"payment": {"entity": {"id": "pay_w", "order_id": order_id, "status": "captured"}}}
    });

    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/payments")
        .header(header::CONTENT_TYPE, "application/json")
        .header(WEBHOOK_SIGNATURE_HEADER, "deadbeef")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.count_with_status(TransactionStatus::Pending).await, 1);
}

#[tokio::test]
async fn signed_webhook_activates_without_bearer_token() {
    let app = test_app().await;
    let order_id = app.open_order().await;
    let payload = json!({
        "event": "payment.captured",
        "payload": {"payment": {"entity": {"id": "pay_w2", "order_id": order_id, "status": "captured"}}}
    })
    .to_string();
    let signature = sign(WEBHOOK_SECRET.as_bytes(), payload.as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/payments")
        .header(header::CONTENT_TYPE, "application/json")
        .header(WEBHOOK_SIGNATURE_HEADER, signature)
        .body(Body::from(payload))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "activated");
    assert_eq!(app.store.count_with_status(TransactionStatus::Completed).await, 1);
}

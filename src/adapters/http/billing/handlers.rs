//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use secrecy::SecretString;

use crate::adapters::http::middleware::RequireAuth;
use crate::application::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CreateOrderCommand, CreateOrderHandler,
    GetSubscriptionHandler, HandleGatewayWebhookCommand, HandleGatewayWebhookHandler,
    ListTransactionsHandler, PaymentVerificationEngine, VerifyPaymentCommand, VerifyPaymentHandler,
};
use crate::domain::billing::{BillingError, PlanCatalog, RetryPolicy, VerificationChain};
use crate::domain::foundation::PlanId;
use crate::ports::{AccountRepository, NotificationSink, PaymentGateway, TransactionLedger};

use super::dto::{
    CreateOrderRequest, ErrorResponse, HealthResponse, OrderResponse, PlanListResponse,
    PlanResponse, SubscriptionResponse, SubscriptionViewResponse, TransactionListResponse,
    TransactionResponse, VerifyPaymentRequest, VerifyPaymentResponse, WebhookAckResponse,
};

/// Header carrying the HMAC-SHA256 of the raw webhook body.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Storage, gateway and notification adapters the billing API runs on.
pub struct BillingPorts {
    pub catalog: Arc<PlanCatalog>,
    pub ledger: Arc<dyn TransactionLedger>,
    pub accounts: Arc<dyn AccountRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn NotificationSink>,
}

/// Gateway credentials and verification tuning.
pub struct BillingSettings {
    /// Public key id handed to the checkout widget.
    pub key_id: String,
    /// Signs `order_id|payment_id` on successful checkout.
    pub key_secret: SecretString,
    pub webhook_secret: Option<SecretString>,
    pub lookup_retry: RetryPolicy,
}

/// Shared application state.
///
/// Cloned for each request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub catalog: Arc<PlanCatalog>,
    pub ledger: Arc<dyn TransactionLedger>,
    pub accounts: Arc<dyn AccountRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub engine: Arc<PaymentVerificationEngine>,
    pub webhook: Arc<HandleGatewayWebhookHandler>,
    pub checkout_key_id: Arc<str>,
}

impl BillingAppState {
    pub fn new(ports: BillingPorts, settings: BillingSettings) -> Self {
        let chain = VerificationChain::standard(
            settings.key_secret,
            Arc::clone(&ports.gateway),
            settings.lookup_retry,
        );
        let engine = Arc::new(PaymentVerificationEngine::new(
            Arc::clone(&ports.ledger),
            Arc::clone(&ports.accounts),
            Arc::clone(&ports.catalog),
            Arc::new(chain),
            ports.notifier,
        ));
        let webhook = Arc::new(HandleGatewayWebhookHandler::new(
            Arc::clone(&engine),
            settings.webhook_secret,
        ));

        Self {
            catalog: ports.catalog,
            ledger: ports.ledger,
            accounts: ports.accounts,
            gateway: ports.gateway,
            engine,
            webhook,
            checkout_key_id: Arc::from(settings.key_id),
        }
    }

    pub fn create_order_handler(&self) -> CreateOrderHandler {
        CreateOrderHandler::new(
            self.ledger.clone(),
            self.accounts.clone(),
            self.gateway.clone(),
            self.catalog.clone(),
        )
    }

    pub fn verify_payment_handler(&self) -> VerifyPaymentHandler {
        VerifyPaymentHandler::new(self.engine.clone())
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.accounts.clone())
    }

    pub fn get_subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(self.accounts.clone(), self.catalog.clone())
    }

    pub fn list_transactions_handler(&self) -> ListTransactionsHandler {
        ListTransactionsHandler::new(self.ledger.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Public endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/billing/plans
pub async fn list_plans(State(state): State<BillingAppState>) -> impl IntoResponse {
    Json(PlanListResponse {
        plans: state.catalog.list_plans().iter().map(PlanResponse::from).collect(),
    })
}

/// GET /api/billing/plans/:plan_id
pub async fn get_plan(
    State(state): State<BillingAppState>,
    Path(plan_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let plan_id = PlanId::new(plan_id).map_err(BillingError::from)?;
    let plan = state.catalog.get_plan(&plan_id)?;
    Ok(Json(PlanResponse::from(plan)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Authenticated endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/billing/orders
pub async fn create_order(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = CreateOrderCommand {
        user_id: user.id,
        plan_id: PlanId::new(request.plan_id).map_err(BillingError::from)?,
    };

    let result = state.create_order_handler().handle(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse::new(result, &state.checkout_key_id)),
    ))
}

/// POST /api/billing/verify
pub async fn verify_payment(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = VerifyPaymentCommand {
        user_id: user.id,
        order_id: request.order_id,
        payment_id: request.payment_id,
        signature: request.signature,
        plan_id: PlanId::new(request.plan_id).map_err(BillingError::from)?,
    };

    let activation = state.verify_payment_handler().handle(cmd).await?;

    Ok(Json(VerifyPaymentResponse::from(activation)))
}

/// GET /api/billing/subscription
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let view = state.get_subscription_handler().handle(&user.id).await?;
    Ok(Json(SubscriptionViewResponse::from(view)))
}

/// POST /api/billing/subscription/cancel
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let cancelled = state
        .cancel_subscription_handler()
        .handle(CancelSubscriptionCommand { user_id: user.id })
        .await?;
    Ok(Json(SubscriptionResponse::from(&cancelled)))
}

/// GET /api/billing/transactions
pub async fn list_transactions(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let entries = state.list_transactions_handler().handle(&user.id).await?;
    Ok(Json(TransactionListResponse {
        transactions: entries.into_iter().map(TransactionResponse::from).collect(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhooks
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/payments
///
/// Any 2xx tells the gateway to stop redelivering.
pub async fn handle_payment_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let outcome = state
        .webhook
        .handle(HandleGatewayWebhookCommand {
            payload: body.to_vec(),
            signature,
        })
        .await?;

    Ok(Json(WebhookAckResponse::from(&outcome)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl BillingApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BillingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BillingError::Conflict { .. } => StatusCode::CONFLICT,
            BillingError::VerificationFailed { .. } | BillingError::ValidationFailed { .. } => {
                StatusCode::BAD_REQUEST
            }
            BillingError::InvalidWebhookSignature => StatusCode::UNAUTHORIZED,
            BillingError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BillingError::InconsistentState(_) | BillingError::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        // Storage details stay in the logs.
        let message = match &self.0 {
            BillingError::Infrastructure(_) => "Internal server error".to_string(),
            other => other.message(),
        };
        let body = ErrorResponse::new(self.0.code().to_string(), message);
        (status, Json(body)).into_response()
    }
}

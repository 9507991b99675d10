//! Razorpay payment gateway adapter.
//!
//! Implements `PaymentGateway` over the REST API using HTTP basic auth with
//! the key id and key secret.
//!
//! ```ignore
//! let config = RazorpayConfig::new(key_id, key_secret);
//! let gateway = RazorpayGateway::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use super::gateway_types::{ApiErrorEnvelope, OrderEntity, OrderRequestBody, PaymentCollection};
use crate::domain::billing::GatewayPayment;
use crate::ports::{CreateOrderRequest, GatewayError, GatewayErrorCode, GatewayOrder, PaymentGateway};

const DEFAULT_BASE_URL: &str = "https://api.razorpay.com";

#[derive(Clone)]
pub struct RazorpayConfig {
    key_id: String,
    key_secret: SecretString,
    api_base_url: String,
    timeout: Duration,
}

impl RazorpayConfig {
    pub fn new(key_id: impl Into<String>, key_secret: SecretString) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct RazorpayGateway {
    config: RazorpayConfig,
    http_client: reqwest::Client,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(self.url(path))
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.expose_secret()))
    }

    async fn send(&self, request: reqwest::RequestBuilder, op: &'static str) -> Result<reqwest::Response, GatewayError> {
        request.send().await.map_err(|e| {
            tracing::warn!(operation = op, error = %e, "Payment gateway request failed");
            GatewayError::network(e.to_string())
        })
    }
}

/// Maps a non-success response to a gateway error.
async fn error_from_response(response: reqwest::Response, op: &'static str) -> GatewayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(&body).ok();
    let description = parsed
        .as_ref()
        .and_then(|e| e.error.description.clone())
        .unwrap_or_else(|| body.clone());

    let code = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayErrorCode::AuthenticationError,
        StatusCode::TOO_MANY_REQUESTS => GatewayErrorCode::RateLimitExceeded,
        s if s.is_server_error() => GatewayErrorCode::ProviderError,
        _ => GatewayErrorCode::BadRequest,
    };

    tracing::error!(
        operation = op,
        status = status.as_u16(),
        error = %description,
        "Payment gateway returned an error"
    );

    let mut err = GatewayError::new(code, format!("Gateway API error ({}): {}", status, description));
    if let Some(provider_code) = parsed.and_then(|e| e.error.code) {
        err = err.with_provider_code(provider_code);
    }
    err
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    op: &'static str,
) -> Result<T, GatewayError> {
    response.json().await.map_err(|e| {
        tracing::error!(operation = op, error = %e, "Failed to parse gateway response");
        GatewayError::invalid_response(format!("Failed to parse gateway response: {}", e))
    })
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError> {
        let body = OrderRequestBody {
            amount: request.amount_minor_units,
            currency: &request.currency,
            receipt: &request.receipt,
            notes: &request.notes,
        };

        let builder = self
            .http_client
            .post(self.url("/v1/orders"))
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.expose_secret()))
            .json(&body);
        let response = self.send(builder, "create_order").await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "create_order").await);
        }

        let order: OrderEntity = parse_json(response, "create_order").await?;
        tracing::info!(order_id = %order.id, status = ?order.status, "Gateway order created");
        Ok(order.into())
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<GatewayPayment>, GatewayError> {
        let response = self
            .send(self.get(&format!("/v1/payments/{}", payment_id)), "fetch_payment")
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                let missing = serde_json::from_str::<ApiErrorEnvelope>(&body)
                    .map(|e| e.error.is_missing_resource())
                    .unwrap_or(false);
                if missing {
                    return Ok(None);
                }
                return Err(GatewayError::new(
                    GatewayErrorCode::BadRequest,
                    format!("Gateway rejected payment lookup: {}", body),
                ));
            }
            s if !s.is_success() => return Err(error_from_response(response, "fetch_payment").await),
            _ => {}
        }

        parse_json(response, "fetch_payment").await.map(Some)
    }

    async fn list_payments_for_order(&self, order_id: &str) -> Result<Vec<GatewayPayment>, GatewayError> {
        let response = self
            .send(
                self.get(&format!("/v1/orders/{}/payments", order_id)),
                "list_payments_for_order",
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(error_from_response(response, "list_payments_for_order").await);
        }

        let collection: PaymentCollection = parse_json(response, "list_payments_for_order").await?;
        Ok(collection.items)
    }
}

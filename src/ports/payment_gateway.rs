//! Payment gateway port.
//!
//! The gateway creates orders and is the authority on whether a payment was
//! captured. Adapters wrap a concrete provider's REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::billing::GatewayPayment;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates an order the client can pay against.
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError>;

    /// Fetches a payment by id. `Ok(None)` when the gateway has no such payment.
    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<GatewayPayment>, GatewayError>;

    /// Lists every payment attempt made against an order.
    async fn list_payments_for_order(
        &self,
        order_id: &str,
    ) -> Result<Vec<GatewayPayment>, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOrderRequest {
    pub amount_minor_units: i64,
    pub currency: String,
    /// Merchant reference, unique per request, at most 40 characters.
    pub receipt: String,
    /// Free-form notes echoed back by the gateway.
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayOrder {
    pub order_id: String,
    pub amount_minor_units: i64,
    pub currency: String,
}

/// Errors from payment gateway calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
    /// Provider's own error code when it sent one.
    pub provider_code: Option<String>,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::AuthenticationError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::RateLimitExceeded, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProviderError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidResponse, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorCode {
    NetworkError,
    AuthenticationError,
    RateLimitExceeded,
    /// Request rejected by the provider (4xx other than auth/rate limit).
    BadRequest,
    /// Provider-side failure (5xx).
    ProviderError,
    /// Response body did not match the expected shape.
    InvalidResponse,
}

impl GatewayErrorCode {
    /// Transient conditions worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError
                | GatewayErrorCode::RateLimitExceeded
                | GatewayErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::BadRequest => "bad_request",
            GatewayErrorCode::ProviderError => "provider_error",
            GatewayErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}

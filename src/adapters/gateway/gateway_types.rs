//! Wire types for the Razorpay-compatible REST API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::billing::GatewayPayment;
use crate::ports::GatewayOrder;

/// Body of `POST /v1/orders`.
#[derive(Debug, Serialize)]
pub struct OrderRequestBody<'a> {
    pub amount: i64,
    pub currency: &'a str,
    pub receipt: &'a str,
    pub notes: &'a HashMap<String, String>,
}

/// Order entity as returned by the API.
#[derive(Debug, Deserialize)]
pub struct OrderEntity {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<OrderEntity> for GatewayOrder {
    fn from(order: OrderEntity) -> Self {
        GatewayOrder {
            order_id: order.id,
            amount_minor_units: order.amount,
            currency: order.currency,
        }
    }
}

/// `{ "entity": "collection", "count": n, "items": [...] }`.
#[derive(Debug, Deserialize)]
pub struct PaymentCollection {
    #[serde(default)]
    pub items: Vec<GatewayPayment>,
}

/// Error envelope: `{ "error": { "code": "...", "description": "..." } }`.
#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ApiErrorBody {
    /// The API reports unknown ids as a bad request rather than a 404.
    pub fn is_missing_resource(&self) -> bool {
        self.description
            .as_deref()
            .map(|d| d.contains("does not exist"))
            .unwrap_or(false)
    }
}

//! Webhook events posted by the payment gateway.

use serde::Deserialize;

/// Payment as reported by the gateway, in webhooks and API lookups alike.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    /// Absent for payments not tied to an order.
    #[serde(default)]
    pub order_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl GatewayPayment {
    /// Only a captured payment proves money moved.
    pub fn is_captured(&self) -> bool {
        self.status == "captured"
    }

    /// Created or authorized but not yet captured.
    pub fn is_in_flight(&self) -> bool {
        matches!(self.status.as_str(), "created" | "authorized")
    }

    pub fn belongs_to_order(&self, order_id: &str) -> bool {
        self.order_id.as_deref() == Some(order_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventKind {
    PaymentCaptured,
    PaymentFailed,
    Other(String),
}

impl GatewayEventKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "payment.captured" => GatewayEventKind::PaymentCaptured,
            "payment.failed" => GatewayEventKind::PaymentFailed,
            other => GatewayEventKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PaymentWrapper {
    entity: GatewayPayment,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EventPayload {
    #[serde(default)]
    payment: Option<PaymentWrapper>,
}

/// Webhook envelope: `{ "event": "...", "payload": { "payment": { "entity": {...} } } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    #[serde(default)]
    payload: EventPayload,
}

impl GatewayEvent {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn kind(&self) -> GatewayEventKind {
        GatewayEventKind::from_name(&self.event)
    }

    pub fn payment(&self) -> Option<&GatewayPayment> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }
}

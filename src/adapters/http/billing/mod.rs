//! HTTP adapter for billing endpoints.
//!
//! - `GET /api/billing/plans` - List plans
//! - `GET /api/billing/plans/:plan_id` - One plan
//! - `POST /api/billing/orders` - Open a checkout order
//! - `POST /api/billing/verify` - Confirm a finished checkout
//! - `GET /api/billing/subscription` - Current subscription
//! - `POST /api/billing/subscription/cancel` - Cancel subscription
//! - `GET /api/billing/transactions` - Ledger history
//! - `POST /api/webhooks/payments` - Gateway webhooks

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::ErrorResponse;
pub use handlers::{BillingApiError, BillingAppState, BillingPorts, BillingSettings, WEBHOOK_SIGNATURE_HEADER};
pub use routes::{billing_router, billing_routes, webhook_routes};

//! Billing command and query handlers.
//!
//! Every payment confirmation path (client callback, webhook) funnels through
//! `PaymentVerificationEngine`.

mod cancel_subscription;
mod create_order;
mod handle_gateway_webhook;
mod queries;
mod verification_engine;
mod verify_payment;

pub use cancel_subscription::{CancelSubscriptionCommand, CancelSubscriptionHandler};
pub use create_order::{CreateOrderCommand, CreateOrderHandler, CreateOrderResult};
pub use handle_gateway_webhook::{
    HandleGatewayWebhookCommand, HandleGatewayWebhookHandler, WebhookOutcome,
};
pub use queries::{GetSubscriptionHandler, ListTransactionsHandler, SubscriptionView};
pub use verification_engine::{Activation, PaymentVerificationEngine};
pub use verify_payment::{VerifyPaymentCommand, VerifyPaymentHandler};

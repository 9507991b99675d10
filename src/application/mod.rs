//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::billing::{
    Activation, CancelSubscriptionCommand, CancelSubscriptionHandler, CreateOrderCommand,
    CreateOrderHandler, CreateOrderResult, GetSubscriptionHandler, HandleGatewayWebhookCommand,
    HandleGatewayWebhookHandler, ListTransactionsHandler, PaymentVerificationEngine,
    SubscriptionView, VerifyPaymentCommand, VerifyPaymentHandler, WebhookOutcome,
};

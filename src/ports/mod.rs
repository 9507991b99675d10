//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentGateway` - order creation and authoritative payment lookup
//! - `TransactionLedger` - payment attempts and atomic activation
//! - `AccountRepository` - user accounts and subscription cancellation
//! - `NotificationSink` - best-effort confirmation messages
//! - `SessionValidator` - bearer token validation

mod account_repository;
mod notification_sink;
mod payment_gateway;
mod session_validator;
mod transaction_ledger;

pub use account_repository::AccountRepository;
pub use notification_sink::{NotificationError, NotificationSink, SubscriptionConfirmation};
pub use payment_gateway::{
    CreateOrderRequest, GatewayError, GatewayErrorCode, GatewayOrder, PaymentGateway,
};
pub use session_validator::SessionValidator;
pub use transaction_ledger::{ActivationCommit, CommitOutcome, TransactionLedger};

//! Billing domain module.
//!
//! Plans, the transaction ledger, per-user subscription state and the rules
//! that prove a payment before a subscription is activated.
//!
//! # Module Structure
//!
//! - `catalog` / `plan` - PlanCatalog and Plan
//! - `transaction` - LedgerEntry and its status state machine
//! - `subscription` - SubscriptionState value object
//! - `signature` - HMAC-SHA256 helpers for gateway signatures
//! - `gateway_event` - webhook envelope and payment entity
//! - `verification` - the payment verification chain

mod account;
mod catalog;
mod errors;
mod gateway_event;
mod plan;
pub mod signature;
mod subscription;
mod transaction;
mod verification;

pub use account::UserAccount;
pub use catalog::PlanCatalog;
pub use errors::{BillingError, Resource};
pub use gateway_event::{GatewayEvent, GatewayEventKind, GatewayPayment};
pub use plan::{format_amount, Plan};
pub use subscription::{has_active_subscription, SubscriptionState, SubscriptionStatus};
pub(crate) use subscription::no_active_subscription;
pub use transaction::{LedgerEntry, TransactionStatus, VerificationMethod};
pub use verification::{
    ClientSignatureStep, GatewayLookupStep, PaymentEvidence, RetryPolicy, StepOutcome,
    VerificationChain, VerificationStep, Verdict, WebhookAttestationStep,
};

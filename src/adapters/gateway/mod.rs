//! Payment gateway adapters.
//!
//! - `RazorpayGateway` - REST client authenticated with key id / key secret
//! - `MockPaymentGateway` - scriptable in-process gateway for tests and local runs
//!
//! Secrets are held as `secrecy::SecretString` and never logged.

mod gateway_types;
mod mock_payment_gateway;
mod razorpay_adapter;

pub use mock_payment_gateway::MockPaymentGateway;
pub use razorpay_adapter::{RazorpayConfig, RazorpayGateway};

//! PostgreSQL adapters - Database implementations for billing ports.
//!
//! - `PostgresTransactionLedger` - payment ledger with atomic activation
//! - `PostgresAccountRepository` - account reads and conditional cancellation

mod account_repository;
mod transaction_ledger;

pub use account_repository::PostgresAccountRepository;
pub use transaction_ledger::PostgresTransactionLedger;

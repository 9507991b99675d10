//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Bearer token validation (HS256 JWT, mock)
//! - `gateway` - Payment gateway REST client and scriptable mock
//! - `http` - axum REST API
//! - `memory` - In-memory ledger and account store
//! - `notification` - Confirmation email, log-only and recording notifiers
//! - `postgres` - PostgreSQL ledger and account store

pub mod auth;
pub mod gateway;
pub mod http;
pub mod memory;
pub mod notification;
pub mod postgres;

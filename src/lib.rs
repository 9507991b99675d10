//! Bizhub billing backend.
//!
//! Plan checkout through a payment gateway, proof of payment before any
//! subscription is activated, and idempotent activation shared by the client
//! callback and gateway webhooks.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

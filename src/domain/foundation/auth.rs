//! Authentication types for the domain layer.
//!
//! `AuthenticatedUser` is what the HTTP middleware hands to billing handlers
//! after a bearer token has been validated by a `SessionValidator` adapter.
//! Nothing here depends on the token format.

use super::UserId;
use thiserror::Error;

/// Authenticated caller extracted from a validated token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Subject of the token; keys the billing account.
    pub id: UserId,

    pub email: String,

    /// Display name if the token carries one.
    pub display_name: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name,
        }
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    /// The validator itself could not run (bad key material, etc.).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }
}

//! Session validation port for bearer tokens.
//!
//! All implementations must check signature, issuer, audience and expiry
//! before returning a user.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates access tokens and extracts user identity.
///
/// # Contract
///
/// - `AuthError::InvalidToken` for malformed tokens or bad signatures
/// - `AuthError::TokenExpired` for expired tokens
/// - `AuthError::ServiceUnavailable` when validation itself cannot run
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validates a raw token (without the `Bearer ` prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

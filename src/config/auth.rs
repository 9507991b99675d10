//! Authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::auth::JwtConfig;

/// Bearer token settings (HS256, shared secret with the account service).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: SecretString,

    /// Expected `iss` claim
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Expected `aud` claim
    #[serde(default = "default_audience")]
    pub audience: String,
}

impl AuthConfig {
    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::new(self.jwt_secret.clone(), self.issuer.clone(), self.audience.clone())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let secret = self.jwt_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        if secret.len() < 32 {
            return Err(ValidationError::JwtSecretTooShort);
        }
        if self.issuer.trim().is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__ISSUER"));
        }
        if self.audience.trim().is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__AUDIENCE"));
        }
        Ok(())
    }
}

fn default_issuer() -> String {
    "bizhub-accounts".to_string()
}

fn default_audience() -> String {
    "bizhub-api".to_string()
}

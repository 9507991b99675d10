//! Email configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Email configuration (Resend). Without an API key, confirmations are only logged.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub resend_api_key: Option<SecretString>,

    #[serde(default = "default_from_email")]
    pub from_email: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl EmailConfig {
    /// Formatted "From" header value
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    /// API key, treating an empty value as unset.
    pub fn api_key(&self) -> Option<SecretString> {
        self.resend_api_key
            .as_ref()
            .filter(|k| !k.expose_secret().trim().is_empty())
            .cloned()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(key) = self.api_key() {
            if !key.expose_secret().starts_with("re_") {
                return Err(ValidationError::InvalidResendKey);
            }
        }
        if !self.from_email.contains('@') {
            return Err(ValidationError::InvalidFromEmail);
        }
        Ok(())
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            from_email: default_from_email(),
            from_name: default_from_name(),
        }
    }
}

fn default_from_email() -> String {
    "billing@bizhub.app".to_string()
}

fn default_from_name() -> String {
    "Bizhub".to_string()
}

//! Payment gateway configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;
use crate::adapters::gateway::RazorpayConfig;
use crate::domain::billing::RetryPolicy;

/// Payment gateway configuration (Razorpay-compatible)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Public key id (`rzp_test_...` or `rzp_live_...`)
    pub key_id: String,

    /// Key secret; signs checkout callbacks and authenticates API calls
    pub key_secret: SecretString,

    /// Webhook signing secret. Required in production; without it, captures are
    /// confirmed by gateway lookup and failure notices are ignored.
    pub webhook_secret: Option<SecretString>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Gateway lookup attempts before giving up
    #[serde(default = "default_fallback_max_attempts")]
    pub fallback_max_attempts: u32,

    /// Linear backoff step between lookup attempts, in milliseconds
    #[serde(default = "default_fallback_backoff_ms")]
    pub fallback_backoff_ms: u64,
}

impl PaymentConfig {
    pub fn is_test_mode(&self) -> bool {
        self.key_id.starts_with("rzp_test_")
    }

    pub fn is_live_mode(&self) -> bool {
        self.key_id.starts_with("rzp_live_")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.fallback_max_attempts,
            Duration::from_millis(self.fallback_backoff_ms),
        )
    }

    pub fn gateway_config(&self) -> RazorpayConfig {
        RazorpayConfig::new(self.key_id.clone(), self.key_secret.clone())
            .with_base_url(self.api_base_url.clone())
    }

    /// Webhook secret, treating an empty value as unset.
    pub fn webhook_secret(&self) -> Option<SecretString> {
        self.webhook_secret
            .as_ref()
            .filter(|s| !s.expose_secret().trim().is_empty())
            .cloned()
    }

    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.key_id.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__KEY_ID"));
        }
        if self.key_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__KEY_SECRET"));
        }
        if !self.key_id.starts_with("rzp_") {
            return Err(ValidationError::InvalidGatewayKeyId);
        }
        if !(1..=10).contains(&self.fallback_max_attempts) {
            return Err(ValidationError::InvalidLookupAttempts);
        }
        if *environment == Environment::Production && !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::GatewayUrlMustBeHttps);
        }
        if *environment == Environment::Production && self.webhook_secret().is_none() {
            return Err(ValidationError::MissingRequired("PAYMENT__WEBHOOK_SECRET"));
        }
        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.razorpay.com".to_string()
}

fn default_fallback_max_attempts() -> u32 {
    3
}

fn default_fallback_backoff_ms() -> u64 {
    250
}

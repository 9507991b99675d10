//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the `config`
//! and `dotenvy` crates. Variables use the `BIZHUB` prefix and `__` between
//! nesting levels.
//!
//! # Example
//!
//! ```no_run
//! use bizhub::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod email;
mod error;
mod payment;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection
    pub database: DatabaseConfig,

    /// Bearer token validation
    pub auth: AuthConfig,

    /// Payment gateway credentials and verification tuning
    pub payment: PaymentConfig,

    /// Confirmation emails (Resend)
    #[serde(default)]
    pub email: EmailConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `BIZHUB` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `BIZHUB__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `BIZHUB__PAYMENT__KEY_SECRET=...` -> `payment.key_secret = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or unparseable.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("BIZHUB")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid value found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate()?;
        self.payment.validate(&self.server.environment)?;
        self.email.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

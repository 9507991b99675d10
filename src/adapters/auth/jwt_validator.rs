//! HS256 JWT session validator.
//!
//! Tokens are issued by the account service with a shared secret. This
//! adapter checks signature, issuer, audience and expiry, then maps claims to
//! an `AuthenticatedUser`.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

#[derive(Clone)]
pub struct JwtConfig {
    secret: SecretString,
    issuer: String,
    audience: String,
}

impl JwtConfig {
    pub fn new(secret: SecretString, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            secret,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

pub struct JwtSessionValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionValidator {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(config.secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    tracing::warn!(error = %e, "Token issued for another party");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::warn!(error = %e, "Token validation failed");
                    AuthError::InvalidToken
                }
            }
        })?;

        let claims = data.claims;
        let id = UserId::new(claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let email = claims.email.ok_or_else(|| {
            tracing::warn!(user_id = %id, "Token missing email claim");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(id, email, claims.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "an-hs256-test-secret-of-enough-length!";

    fn config() -> JwtConfig {
        JwtConfig::new(SecretString::new(SECRET.to_string()), "bizhub-accounts", "bizhub-api")
    }

    fn token(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims() -> Claims {
        Claims {
            sub: "user-42".to_string(),
            iss: "bizhub-accounts".to_string(),
            aud: "bizhub-api".to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            email: Some("owner@shop.example".to_string()),
            name: Some("Shop Owner".to_string()),
        }
    }

    #[tokio::test]
    async fn valid_token_yields_user() {
        let validator = JwtSessionValidator::new(&config());
        let user = validator.validate(&token(&claims(), SECRET)).await.unwrap();

        assert_eq!(user.id.as_str(), "user-42");
        assert_eq!(user.email, "owner@shop.example");
        assert_eq!(user.display_name.as_deref(), Some("Shop Owner"));
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let validator = JwtSessionValidator::new(&config());
        let err = validator
            .validate(&token(&claims(), "some-other-secret-entirely-different"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn expired_token_is_reported() {
        let validator = JwtSessionValidator::new(&config());
        let mut expired = claims();
        expired.exp = chrono::Utc::now().timestamp() - 3600;

        let err = validator.validate(&token(&expired, SECRET)).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn wrong_audience_is_invalid() {
        let validator = JwtSessionValidator::new(&config());
        let mut other = claims();
        other.aud = "someone-else".to_string();

        assert!(validator.validate(&token(&other, SECRET)).await.is_err());
    }

    #[tokio::test]
    async fn missing_email_is_invalid() {
        let validator = JwtSessionValidator::new(&config());
        let mut no_email = claims();
        no_email.email = None;

        assert!(validator.validate(&token(&no_email, SECRET)).await.is_err());
    }

    #[tokio::test]
    async fn garbage_is_invalid() {
        let validator = JwtSessionValidator::new(&config());
        assert!(matches!(
            validator.validate("not.a.jwt").await,
            Err(AuthError::InvalidToken)
        ));
    }
}

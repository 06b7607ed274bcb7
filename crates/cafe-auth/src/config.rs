//! Token issuing configuration.
//!
//! Lifetimes use humantime strings in TOML (`"5m"`, `"1d"`).
//!
//! # Example
//!
//! ```toml
//! [auth]
//! issuer = "cafe-ratings"
//! access_token_lifetime = "5m"
//! refresh_token_lifetime = "1d"
//!
//! [auth.signing]
//! algorithm = "HS256"
//! secret = "change-me"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Secret used when none is configured. Startup logs a warning while it is
/// in use.
pub const DEVELOPMENT_SECRET: &str = "insecure-development-secret";

/// Configuration for token issuing and validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Value of the `iss` claim; tokens from other issuers are rejected.
    pub issuer: String,

    /// Signing key settings.
    pub signing: SigningConfig,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "cafe-ratings".to_string(),
            signing: SigningConfig::default(),
            access_token_lifetime: Duration::from_secs(5 * 60),
            refresh_token_lifetime: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Signing key settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// `HS256` (shared secret) or `RS256` (key pair generated at startup).
    pub algorithm: String,

    /// HMAC secret, required for `HS256`.
    pub secret: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "HS256".to_string(),
            secret: DEVELOPMENT_SECRET.to_string(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the issuer is empty, the
    /// algorithm is unsupported or a lifetime is zero, and
    /// `ConfigError::Missing` if `HS256` is selected without a secret.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        match self.signing.algorithm.as_str() {
            "HS256" => {
                if self.signing.secret.is_empty() {
                    return Err(ConfigError::Missing(
                        "auth.signing.secret is required for HS256".to_string(),
                    ));
                }
            }
            "RS256" => {}
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid signing algorithm: '{other}'. Must be HS256 or RS256"
                )));
            }
        }

        if self.access_token_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "access_token_lifetime must be > 0".to_string(),
            ));
        }
        if self.refresh_token_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "refresh_token_lifetime must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns `true` while the built-in development secret signs tokens.
    #[must_use]
    pub fn uses_development_secret(&self) -> bool {
        self.signing.algorithm == "HS256" && self.signing.secret == DEVELOPMENT_SECRET
    }
}

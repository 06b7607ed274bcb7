//! Issues access/refresh pairs for users and validates presented tokens.

use std::time::Duration;

use serde::Serialize;

use cafe_core::User;

use crate::config::AuthConfig;
use crate::token::jwt::{
    JwtError, JwtService, SigningAlgorithm, SigningKey, TokenClaims, TokenType,
};

/// Response body of the obtain-token endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Response body of the refresh endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access: String,
}

/// Token lifecycle on top of [`JwtService`].
#[derive(Debug)]
pub struct TokenService {
    jwt: JwtService,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(jwt: JwtService, access_lifetime: Duration, refresh_lifetime: Duration) -> Self {
        Self {
            jwt,
            access_lifetime,
            refresh_lifetime,
        }
    }

    /// Builds the service from configuration, generating an RSA key pair
    /// when `RS256` is selected.
    ///
    /// # Errors
    ///
    /// Returns an error for an unsupported algorithm or if key generation fails.
    pub fn from_config(config: &AuthConfig) -> Result<Self, JwtError> {
        let key = match config.signing.algorithm.parse::<SigningAlgorithm>()? {
            SigningAlgorithm::HS256 => SigningKey::hmac(config.signing.secret.as_bytes()),
            SigningAlgorithm::RS256 => SigningKey::generate_rsa()?,
        };
        tracing::info!(
            algorithm = %key.algorithm,
            issuer = %config.issuer,
            "Token signing key ready"
        );
        Ok(Self::new(
            JwtService::new(key, config.issuer.clone()),
            config.access_token_lifetime,
            config.refresh_token_lifetime,
        ))
    }

    /// Issues a fresh access/refresh pair for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access: self.issue(user, TokenType::Access)?,
            refresh: self.issue(user, TokenType::Refresh)?,
        })
    }

    /// Issues a single token of the given type for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn issue(&self, user: &User, token_type: TokenType) -> Result<String, JwtError> {
        let lifetime = match token_type {
            TokenType::Access => self.access_lifetime,
            TokenType::Refresh => self.refresh_lifetime,
        };
        let claims = TokenClaims::builder(self.jwt.issuer(), user.id, &user.username, user.role)
            .token_type(token_type)
            .expires_in_seconds(i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX / 2))
            .build();
        self.jwt.encode(&claims)
    }

    /// Validates an access token presented as a bearer credential.
    ///
    /// # Errors
    ///
    /// Fails for invalid or expired tokens and for refresh tokens.
    pub fn validate_access(&self, token: &str) -> Result<TokenClaims, JwtError> {
        self.jwt.decode_typed(token, TokenType::Access)
    }

    /// Validates a refresh token.
    ///
    /// # Errors
    ///
    /// Fails for invalid or expired tokens and for access tokens.
    pub fn validate_refresh(&self, token: &str) -> Result<TokenClaims, JwtError> {
        self.jwt.decode_typed(token, TokenType::Refresh)
    }

    /// Validates a token of either type.
    ///
    /// # Errors
    ///
    /// Fails for invalid or expired tokens.
    pub fn validate_any(&self, token: &str) -> Result<TokenClaims, JwtError> {
        self.jwt.decode(token)
    }
}

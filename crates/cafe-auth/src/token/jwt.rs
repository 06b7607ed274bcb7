//! JWT token generation and validation.
//!
//! Tokens carry the user's role tag so permission checks need no store
//! lookup. Two signing modes are supported:
//!
//! - **HS256**: HMAC with a configured shared secret (default)
//! - **RS256**: RSA with a 2048-bit key pair generated at startup
//!
//! ## Example
//!
//! ```ignore
//! use cafe_auth::token::jwt::{JwtService, SigningKey, TokenClaims, TokenType};
//!
//! let service = JwtService::new(SigningKey::hmac(b"secret"), "cafe-ratings");
//! let claims = TokenClaims::builder("cafe-ratings", 1, "alice", Role::Admin)
//!     .token_type(TokenType::Access)
//!     .expires_in_seconds(300)
//!     .build();
//! let token = service.encode(&claims)?;
//! let decoded = service.decode(&token)?;
//! ```

use std::fmt;
use std::str::FromStr;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use cafe_core::{Id, Role};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// A valid token of the wrong kind was presented.
    #[error("Token has wrong type, expected {expected}")]
    WrongTokenType {
        /// The token type the caller required.
        expected: String,
    },

    /// Failed to generate a cryptographic key.
    #[error("Key generation error: {message}")]
    KeyGenerationError {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `WrongTokenType` error.
    #[must_use]
    pub fn wrong_token_type(expected: impl Into<String>) -> Self {
        Self::WrongTokenType {
            expected: expected.into(),
        }
    }

    /// Creates a new `KeyGenerationError`.
    #[must_use]
    pub fn key_generation_error(message: impl Into<String>) -> Self {
        Self::KeyGenerationError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a validation error (expired, invalid signature, etc.).
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::Expired
                | Self::InvalidSignature
                | Self::InvalidClaims { .. }
                | Self::WrongTokenType { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::decoding_error(err.to_string()),
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms for JWT tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256 and a shared secret.
    HS256,
    /// RSA with SHA-256.
    RS256,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::RS256 => Algorithm::RS256,
        }
    }

    /// Returns the algorithm name as used in JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::RS256 => "RS256",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::HS256),
            "RS256" => Ok(Self::RS256),
            other => Err(JwtError::invalid_key(format!(
                "unsupported signing algorithm '{other}'"
            ))),
        }
    }
}

// ============================================================================
// Token Claims
// ============================================================================

/// Distinguishes short-lived access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Claims carried by both access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (user id, as a string per RFC 7519).
    pub sub: String,

    /// Username at issue time.
    pub username: String,

    /// Role tag at issue time.
    pub role: Role,

    /// Access or refresh.
    pub token_type: TokenType,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// JWT ID.
    pub jti: String,
}

impl TokenClaims {
    /// Creates a new builder for token claims.
    #[must_use]
    pub fn builder(
        issuer: impl Into<String>,
        user_id: Id,
        username: impl Into<String>,
        role: Role,
    ) -> TokenClaimsBuilder {
        TokenClaimsBuilder::new(issuer, user_id, username, role)
    }

    /// Parses the subject back into a user id.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::InvalidClaims` if `sub` is not an integer.
    pub fn user_id(&self) -> Result<Id, JwtError> {
        self.sub
            .parse()
            .map_err(|_| JwtError::invalid_claims(format!("sub '{}' is not a user id", self.sub)))
    }
}

/// Builder for `TokenClaims`.
pub struct TokenClaimsBuilder {
    iss: String,
    sub: String,
    username: String,
    role: Role,
    token_type: TokenType,
    iat: i64,
    exp: i64,
    jti: String,
}

impl TokenClaimsBuilder {
    fn new(issuer: impl Into<String>, user_id: Id, username: impl Into<String>, role: Role) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Self {
            iss: issuer.into(),
            sub: user_id.to_string(),
            username: username.into(),
            role,
            token_type: TokenType::Access,
            iat: now,
            exp: now + 300, // Default 5 minutes
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Sets the token type.
    #[must_use]
    pub fn token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = token_type;
        self
    }

    /// Sets the expiration time in seconds from now.
    #[must_use]
    pub fn expires_in_seconds(mut self, seconds: i64) -> Self {
        self.exp = self.iat + seconds;
        self
    }

    /// Builds the token claims.
    #[must_use]
    pub fn build(self) -> TokenClaims {
        TokenClaims {
            iss: self.iss,
            sub: self.sub,
            username: self.username,
            role: self.role,
            token_type: self.token_type,
            iat: self.iat,
            exp: self.exp,
            jti: self.jti,
        }
    }
}

// ============================================================================
// Signing Key
// ============================================================================

/// A key (or key pair) for JWT signing and verification.
pub struct SigningKey {
    /// Key ID, set for generated RSA keys.
    pub kid: Option<String>,

    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,

    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Creates an HS256 key from a shared secret.
    #[must_use]
    pub fn hmac(secret: &[u8]) -> Self {
        Self {
            kid: None,
            algorithm: SigningAlgorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Generates a new 2048-bit RSA key pair for RS256.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn generate_rsa() -> Result<Self, JwtError> {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let public_key = private_key.to_public_key();

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        Ok(Self {
            kid: Some(uuid::Uuid::new_v4().to_string()),
            algorithm: SigningAlgorithm::RS256,
            encoding_key,
            decoding_key,
        })
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// JWT Service
// ============================================================================

/// Service for encoding and decoding JWT tokens.
///
/// This service is thread-safe (`Send + Sync`) and can be shared across
/// async tasks.
#[derive(Debug)]
pub struct JwtService {
    signing_key: SigningKey,
    issuer: String,
}

impl JwtService {
    /// Creates a new JWT service.
    #[must_use]
    pub fn new(signing_key: SigningKey, issuer: impl Into<String>) -> Self {
        Self {
            signing_key,
            issuer: issuer.into(),
        }
    }

    /// Encodes claims into a JWT string.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, JwtError> {
        let mut header = Header::new(self.signing_key.algorithm.to_jwt_algorithm());
        header.kid = self.signing_key.kid.clone();

        encode(&header, claims, &self.signing_key.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Decodes and validates a JWT string (signature, issuer, expiry).
    ///
    /// # Errors
    /// Returns an error if decoding or validation fails.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, JwtError> {
        let mut validation = Validation::new(self.signing_key.algorithm.to_jwt_algorithm());
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = 0;

        decode::<TokenClaims>(token, &self.signing_key.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::from)
    }

    /// Decodes a token and requires it to be of `expected` type.
    ///
    /// # Errors
    /// Returns `JwtError::WrongTokenType` for a valid token of the other type.
    pub fn decode_typed(&self, token: &str, expected: TokenType) -> Result<TokenClaims, JwtError> {
        let claims = self.decode(token)?;
        if claims.token_type != expected {
            return Err(JwtError::wrong_token_type(expected.as_str()));
        }
        Ok(claims)
    }

    /// Returns the issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.signing_key.algorithm
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hs256_service() -> JwtService {
        JwtService::new(SigningKey::hmac(b"test-secret"), "cafe-ratings")
    }

    #[test]
    fn test_hs256_encode_decode() {
        let service = hs256_service();
        let claims = TokenClaims::builder("cafe-ratings", 42, "alice", Role::CafeOwner)
            .expires_in_seconds(300)
            .build();

        let token = service.encode(&claims).unwrap();
        assert!(!token.is_empty());

        let decoded = service.decode(&token).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.user_id().unwrap(), 42);
        assert_eq!(decoded.role, Role::CafeOwner);
        assert_eq!(decoded.token_type, TokenType::Access);
    }

    #[test]
    fn test_rs256_encode_decode() {
        let key = SigningKey::generate_rsa().unwrap();
        assert!(key.kid.is_some());
        let service = JwtService::new(key, "cafe-ratings");
        assert_eq!(service.algorithm(), SigningAlgorithm::RS256);

        let claims = TokenClaims::builder("cafe-ratings", 1, "admin", Role::Admin).build();
        let token = service.encode(&claims).unwrap();
        assert_eq!(service.decode(&token).unwrap().username, "admin");
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let claims = TokenClaims::builder("cafe-ratings", 1, "bob", Role::Basic).build();
        let token = hs256_service().encode(&claims).unwrap();

        let other = JwtService::new(SigningKey::hmac(b"other-secret"), "cafe-ratings");
        assert!(matches!(
            other.decode(&token),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = hs256_service();
        let claims = TokenClaims::builder("cafe-ratings", 1, "bob", Role::Basic)
            .expires_in_seconds(-120)
            .build();
        let token = service.encode(&claims).unwrap();
        assert!(matches!(service.decode(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_foreign_issuer_is_rejected() {
        let claims = TokenClaims::builder("someone-else", 1, "bob", Role::Basic).build();
        let token = hs256_service().encode(&claims).unwrap();
        let err = hs256_service().decode(&token).unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_decode_typed() {
        let service = hs256_service();
        let refresh = TokenClaims::builder("cafe-ratings", 1, "bob", Role::Basic)
            .token_type(TokenType::Refresh)
            .build();
        let token = service.encode(&refresh).unwrap();

        assert!(service.decode_typed(&token, TokenType::Refresh).is_ok());
        assert!(matches!(
            service.decode_typed(&token, TokenType::Access),
            Err(JwtError::WrongTokenType { .. })
        ));
    }

    #[test]
    fn test_garbage_token() {
        let err = hs256_service().decode("not-a-jwt").unwrap_err();
        assert!(matches!(err, JwtError::DecodingError { .. }));
    }

    #[test]
    fn test_signing_algorithm_from_str() {
        assert_eq!(
            "RS256".parse::<SigningAlgorithm>().unwrap(),
            SigningAlgorithm::RS256
        );
        assert!("ES384".parse::<SigningAlgorithm>().is_err());
    }
}

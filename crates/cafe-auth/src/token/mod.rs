//! Token generation and validation.

pub mod jwt;
pub mod service;

pub use jwt::{JwtError, JwtService, SigningAlgorithm, SigningKey, TokenClaims, TokenType};
pub use service::{AccessToken, TokenPair, TokenService};

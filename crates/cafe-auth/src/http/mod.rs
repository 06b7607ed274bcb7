//! Axum HTTP handlers for the token endpoints.

pub mod token;

pub use token::{
    ObtainTokenRequest, RefreshTokenRequest, TokenState, VerifyTokenRequest, obtain_token_handler,
    refresh_token_handler, verify_token_handler,
};

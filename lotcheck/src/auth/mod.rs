//! Upstream authentication.

mod token;

pub use token::{
    AuthToken, CredentialSource, LoginGrant, TokenManager, DEFAULT_SAFETY_MARGIN,
    DEFAULT_TOKEN_TTL,
};

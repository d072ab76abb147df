//! Token-based authentication infrastructure

mod token;

pub use token::{
    TokenClaims, TokenCodec, TokenConfig, DEFAULT_TOKEN_TTL_SECS, TOKEN_AUDIENCE, TOKEN_ISSUER,
};

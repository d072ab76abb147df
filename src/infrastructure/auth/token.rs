//! Signed token generation and verification
//!
//! Compact three-segment tokens (`header.payload.signature`, base64url,
//! HMAC-SHA256) built directly on the crypto primitives. A verified token is
//! a point-in-time grant derived from an API key record; the authentication
//! layer still re-checks that the backing key exists and is enabled.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt::Debug;

use crate::domain::api_key::ApiKeyRecord;
use crate::domain::DomainError;

type HmacSha256 = Hmac<Sha256>;

/// Issuer claim; must match exactly on verification
pub const TOKEN_ISSUER: &str = "deskagent";
/// Audience claim; must match exactly on verification
pub const TOKEN_AUDIENCE: &str = "deskagent-api";
/// Default token lifetime (24 hours)
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Claims carried by a signed token.
///
/// Also the request identity attached by the authentication layer, whether
/// the request carried a token or a raw API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the API key record id
    pub sub: String,
    /// Display name of the key
    pub name: String,
    /// Permission set as granted at issuance time
    pub permissions: Vec<String>,
    /// Issued at, Unix seconds
    pub iat: i64,
    /// Expires at, Unix seconds
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl TokenClaims {
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

#[derive(Serialize)]
struct TokenHeader<'a> {
    alg: &'a str,
    typ: &'a str,
}

/// Signing configuration for the token codec
#[derive(Clone)]
pub struct TokenConfig {
    secret: Vec<u8>,
    ttl_secs: u64,
}

impl TokenConfig {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    /// Random process-lifetime secret (64 random bytes, hex-encoded).
    ///
    /// Tokens signed with a generated secret do not survive a restart;
    /// provision `auth.token_secret` for stable tokens.
    pub fn generated(ttl_secs: u64) -> Self {
        let mut bytes = [0u8; 64];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::new(hex::encode(bytes), ttl_secs)
    }

    /// Configured secret when present, generated otherwise
    pub fn from_secret(secret: Option<String>, ttl_secs: u64) -> Self {
        match secret {
            Some(secret) => Self::new(secret, ttl_secs),
            None => Self::generated(ttl_secs),
        }
    }
}

impl Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"[hidden]")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

/// Generates and verifies signed tokens
#[derive(Debug, Clone)]
pub struct TokenCodec {
    config: TokenConfig,
}

impl TokenCodec {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.config.ttl_secs
    }

    /// Claims for a record at the current instant.
    ///
    /// Shared by token generation and by the identity synthesized for raw
    /// API key authentication, so both identities have the same shape.
    pub fn claims_for(&self, record: &ApiKeyRecord) -> TokenClaims {
        let iat = Utc::now().timestamp();

        TokenClaims {
            sub: record.id().to_string(),
            name: record.name().to_string(),
            permissions: record.permissions().to_vec(),
            iat,
            exp: iat + self.config.ttl_secs as i64,
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
        }
    }

    /// Generate a signed token for a record
    pub fn generate(&self, record: &ApiKeyRecord) -> Result<String, DomainError> {
        let header = serde_json::to_vec(&TokenHeader {
            alg: "HS256",
            typ: "JWT",
        })
        .map_err(|e| DomainError::internal(format!("Failed to encode token header: {}", e)))?;

        let payload = serde_json::to_vec(&self.claims_for(record))
            .map_err(|e| DomainError::internal(format!("Failed to encode token payload: {}", e)))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = self.sign(signing_input.as_bytes())?;

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verify a token and recover its claims.
    ///
    /// Every failure (wrong segment count, bad signature, unparseable
    /// payload, expiry, issuer/audience mismatch) is `None`; a malformed
    /// token must never take down the request pipeline.
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        let mut segments = token.split('.');
        let header_b64 = segments.next()?;
        let payload_b64 = segments.next()?;
        let signature_b64 = segments.next()?;
        if segments.next().is_some() {
            return None;
        }

        let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;

        let mut mac = HmacSha256::new_from_slice(&self.config.secret).ok()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        // constant-time comparison
        mac.verify_slice(&signature).ok()?;

        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let claims: TokenClaims = serde_json::from_slice(&payload).ok()?;

        if claims.is_expired() {
            return None;
        }
        if claims.iss != TOKEN_ISSUER || claims.aud != TOKEN_AUDIENCE {
            return None;
        }

        Some(claims)
    }

    fn sign(&self, input: &[u8]) -> Result<Vec<u8>, DomainError> {
        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|e| DomainError::internal(format!("Invalid signing secret: {}", e)))?;
        mac.update(input);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

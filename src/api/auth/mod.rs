//! Authentication endpoints
//!
//! Token issuance plus introspection of the current identity. Long-lived
//! integrations keep using their raw API key; interactive clients exchange
//! it here for a short-lived signed token.

use axum::{extract::State, http::HeaderMap, Extension};
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::api::admin::api_keys::ApiKeyResponse;
use crate::api::middleware::auth::extract_credential;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::infrastructure::auth::TokenClaims;

/// Token issuance response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: String,
    pub key: ApiKeyResponse,
}

/// Session introspection response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<TokenClaims>,
}

/// Exchange a raw API key for a signed token.
///
/// POST /auth/token
///
/// The key goes in the usual credential position (`Authorization: Bearer`).
/// Issuance counts as a use of the key.
pub async fn issue_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: axum::http::Uri,
) -> Result<Json<TokenResponse>, ApiError> {
    let credential = extract_credential(&headers, &uri)
        .ok_or_else(|| ApiError::unauthorized("No token provided"))?;

    let record = state
        .api_keys
        .validate(&credential)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid API key"))?;

    debug!(id = %record.id(), "Issuing token");

    let token = state.tokens.generate(&record)?;
    state.api_keys.increment_usage(record.id()).await?;

    let expires_at = Utc::now() + Duration::seconds(state.tokens.ttl_secs() as i64);

    Ok(Json(TokenResponse {
        token,
        expires_at: expires_at.to_rfc3339(),
        key: ApiKeyResponse::from(&record.redacted()),
    }))
}

/// Echo the authenticated identity.
///
/// GET /auth/me (behind `require_auth`)
pub async fn me(Extension(identity): Extension<TokenClaims>) -> Json<TokenClaims> {
    Json(identity)
}

/// Report whether the caller is authenticated without ever rejecting.
///
/// GET /auth/session (behind `optional_auth`)
pub async fn session(identity: Option<Extension<TokenClaims>>) -> Json<SessionResponse> {
    let identity = identity.map(|Extension(claims)| claims);

    Json(SessionResponse {
        authenticated: identity.is_some(),
        identity,
    })
}

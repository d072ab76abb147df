//! Authentication middleware
//!
//! Gates protected routes and attaches the request identity. A request may
//! carry either a signed token or a raw API key; both resolve to the same
//! [`TokenClaims`] identity shape for downstream handlers.

use std::collections::HashMap;

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::infrastructure::auth::TokenClaims;

/// Require a valid credential; 401 otherwise.
///
/// Resolution order:
/// 1. Interpret the credential as a signed token. A valid signature is not
///    enough on its own: the backing key must still exist and be enabled,
///    since keys can be revoked after token issuance.
/// 2. Fall back to raw API key validation, synthesizing an identity of the
///    same shape.
///
/// On success the identity is attached as a request extension and the key's
/// usage is metered.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(credential) = extract_credential(request.headers(), request.uri()) else {
        return ApiError::unauthorized("No token provided").into_response();
    };

    if let Some(claims) = state.tokens.verify(&credential) {
        let record = match state.api_keys.get_raw(&claims.sub).await {
            Ok(record) => record,
            Err(e) => return ApiError::from(e).into_response(),
        };

        match record {
            Some(record) if record.enabled() => {
                debug!(sub = %claims.sub, "Request authenticated via token");
                record_usage(&state, &claims.sub).await;
                request.extensions_mut().insert(claims);
                return next.run(request).await;
            }
            _ => {
                return ApiError::unauthorized("API key revoked or disabled").into_response();
            }
        }
    }

    let record = match state.api_keys.validate(&credential).await {
        Ok(record) => record,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match record {
        Some(record) => {
            debug!(id = %record.id(), "Request authenticated via API key");
            record_usage(&state, record.id()).await;
            request.extensions_mut().insert(state.tokens.claims_for(&record));
            next.run(request).await
        }
        None => ApiError::unauthorized("Invalid token or API key").into_response(),
    }
}

/// Attach an identity when a valid token is present; never reject.
///
/// For endpoints that serve anonymous callers but personalize authenticated
/// ones. Only the token interpretation is attempted here.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(claims) = try_token_auth(&state, request.headers(), request.uri()).await {
        request.extensions_mut().insert(claims);
    }

    next.run(request).await
}

async fn try_token_auth(state: &AppState, headers: &HeaderMap, uri: &Uri) -> Option<TokenClaims> {
    let credential = extract_credential(headers, uri)?;
    let claims = state.tokens.verify(&credential)?;

    let record = state.api_keys.get_raw(&claims.sub).await.ok().flatten()?;
    if !record.enabled() {
        return None;
    }

    Some(claims)
}

async fn record_usage(state: &AppState, id: &str) {
    if let Err(e) = state.api_keys.increment_usage(id).await {
        warn!(id = %id, "Failed to record API key usage: {}", e);
    }
}

/// Candidate credential from the `Authorization: Bearer` header, falling back
/// to the `token` query parameter for transports that cannot set headers
/// (event-stream subscriptions).
pub fn extract_credential(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    let Ok(Query(params)) = Query::<HashMap<String, String>>::try_from_uri(uri) else {
        return None;
    };
    params.get("token").cloned()
}

//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::api_key::ApiKeyManager;
use crate::infrastructure::auth::TokenCodec;

/// Shared services threaded through the router.
///
/// Constructed once at server start; middleware and handlers receive it
/// through axum state rather than ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub api_keys: Arc<ApiKeyManager>,
    pub tokens: Arc<TokenCodec>,
}

impl AppState {
    pub fn new(api_keys: Arc<ApiKeyManager>, tokens: Arc<TokenCodec>) -> Self {
        Self { api_keys, tokens }
    }
}

//! Authorization middleware
//!
//! Permission gate applied after authentication. Permissions are opaque
//! strings; holding any one of the required set (or `admin`) grants access.

use std::future::Future;
use std::pin::Pin;

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::types::ApiError;
use crate::domain::api_key::permissions;
use crate::infrastructure::auth::TokenClaims;

/// Factory for a permission-checking middleware.
///
/// Usable with `axum::middleware::from_fn`; must be layered inside an
/// authentication layer so the identity extension is present. A missing
/// identity is an authentication failure (401), distinct from an
/// authenticated caller lacking permission (403).
pub fn require_permission(
    required: &'static [&'static str],
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Clone + Send + 'static
{
    move |request: Request, next: Next| {
        Box::pin(async move {
            let Some(identity) = request.extensions().get::<TokenClaims>() else {
                return ApiError::unauthorized("Authentication required").into_response();
            };

            if !permissions::grants_any(&identity.permissions, required) {
                return ApiError::forbidden("Insufficient permissions").into_response();
            }

            next.run(request).await
        })
    }
}

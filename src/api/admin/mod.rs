//! Admin API endpoints

pub mod api_keys;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Create the admin API router.
///
/// Authentication and the `admin` permission gate are layered on by the
/// caller.
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api-keys",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route(
            "/api-keys/{key_id}",
            get(api_keys::get_api_key)
                .put(api_keys::update_api_key)
                .delete(api_keys::revoke_api_key),
        )
        .route("/api-keys/{key_id}/enable", post(api_keys::enable_api_key))
        .route(
            "/api-keys/{key_id}/disable",
            post(api_keys::disable_api_key),
        )
}

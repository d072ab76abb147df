//! API middleware components

pub mod auth;
pub mod authorize;

pub use auth::{optional_auth, require_auth};
pub use authorize::require_permission;

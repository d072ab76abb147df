//! Infrastructure layer - concrete implementations

pub mod api_key;
pub mod auth;
pub mod logging;

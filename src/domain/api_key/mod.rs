//! API key domain
//!
//! Domain types and the storage trait for API key management.

mod entity;
mod repository;

pub use entity::{permissions, ApiKeyRecord, ApiKeyUpdate, GenerateOptions};
pub use repository::ApiKeyRepository;

//! Domain layer - core entities and storage seams

pub mod api_key;
pub mod error;

pub use api_key::{ApiKeyRecord, ApiKeyRepository, ApiKeyUpdate, GenerateOptions};
pub use error::DomainError;

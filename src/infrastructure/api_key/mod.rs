//! API key infrastructure
//!
//! Key generation, the in-memory table, and the lifecycle manager.

mod generator;
mod manager;
mod repository;

pub use generator::{ApiKeyGenerator, GeneratedSecret};
pub use manager::{ApiKeyManager, GeneratedKey};
pub use repository::InMemoryApiKeyRepository;

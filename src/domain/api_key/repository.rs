//! API key repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::ApiKeyRecord;
use crate::domain::DomainError;

/// Storage seam for the API key table.
///
/// Absence is expressed inside the `Ok` value (`None`/`false`); `Err` is
/// reserved for storage failures, so the in-memory backing never produces
/// one. A durable backing can be swapped in without touching the manager.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync + Debug {
    /// Get a record by its id
    async fn get(&self, id: &str) -> Result<Option<ApiKeyRecord>, DomainError>;

    /// Get a record by its key hash (authentication lookup)
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>, DomainError>;

    /// Insert a new record; id and key hash must be unique
    async fn insert(&self, record: ApiKeyRecord) -> Result<ApiKeyRecord, DomainError>;

    /// Replace an existing record; returns whether it existed
    async fn update(&self, record: &ApiKeyRecord) -> Result<bool, DomainError>;

    /// Hard-delete a record; returns whether it existed
    async fn remove(&self, id: &str) -> Result<bool, DomainError>;

    /// All records in insertion order
    async fn list(&self) -> Result<Vec<ApiKeyRecord>, DomainError>;
}

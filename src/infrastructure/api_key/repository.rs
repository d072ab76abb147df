//! In-memory API key repository implementation

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::api_key::{ApiKeyRecord, ApiKeyRepository};
use crate::domain::DomainError;

/// In-memory implementation of [`ApiKeyRepository`].
///
/// Backed by an insertion-ordered `Vec`: list order is creation order, and
/// lookups are linear scans, which is fine for the handful of keys a local
/// gateway holds. The lock makes the table safe on a multi-threaded runtime.
#[derive(Debug, Default)]
pub struct InMemoryApiKeyRepository {
    records: Arc<RwLock<Vec<ApiKeyRecord>>>,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn get(&self, id: &str) -> Result<Option<ApiKeyRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id() == id).cloned())
    }

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.key_hash() == key_hash).cloned())
    }

    async fn insert(&self, record: ApiKeyRecord) -> Result<ApiKeyRecord, DomainError> {
        let mut records = self.records.write().await;

        if records.iter().any(|r| r.id() == record.id()) {
            return Err(DomainError::conflict(format!(
                "API key with id '{}' already exists",
                record.id()
            )));
        }

        if records.iter().any(|r| r.key_hash() == record.key_hash()) {
            return Err(DomainError::conflict(
                "API key with the same hash already exists",
            ));
        }

        records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, record: &ApiKeyRecord) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;

        match records.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => {
                *slot = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, id: &str) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;

        match records.iter().position(|r| r.id() == id) {
            Some(index) => {
                records.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<ApiKeyRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records.clone())
    }
}

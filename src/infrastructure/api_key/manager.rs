//! API key manager
//!
//! Sole authority for the key table; every other component queries it and
//! never mutates records directly.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::api_key::{
    permissions, ApiKeyRecord, ApiKeyRepository, ApiKeyUpdate, GenerateOptions,
};
use crate::domain::DomainError;

use super::generator::ApiKeyGenerator;

/// Result of generating a new API key
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    /// The full credential string, returned to the caller exactly once
    pub secret: String,
    /// The stored record, unredacted (internal use only)
    pub record: ApiKeyRecord,
}

/// Manages the lifecycle of issued API keys.
///
/// Unknown ids are signalled through `Ok(None)`/`Ok(false)`, never as errors,
/// so the request-path callers stay on plain conditionals.
#[derive(Debug)]
pub struct ApiKeyManager {
    repository: Arc<dyn ApiKeyRepository>,
    generator: ApiKeyGenerator,
}

impl ApiKeyManager {
    pub fn new(repository: Arc<dyn ApiKeyRepository>) -> Self {
        Self {
            repository,
            generator: ApiKeyGenerator::new(),
        }
    }

    /// Generate a new key and store its record.
    ///
    /// The returned secret is not retrievable again; only its hash is kept.
    pub async fn generate(
        &self,
        name: impl Into<String>,
        options: GenerateOptions,
    ) -> Result<GeneratedKey, DomainError> {
        let name = name.into();
        let generated = self.generator.generate();
        let id = self.generator.new_id();

        let mut record = ApiKeyRecord::new(&id, &name, &generated.hash, &generated.display_prefix)
            .with_permissions(
                options.permissions.unwrap_or_else(permissions::default_set),
            );

        if let Some(days) = options.expires_in_days {
            record = record.with_expiry_days(days);
        }
        if let Some(limit) = options.usage_limit {
            record = record.with_usage_limit(limit);
        }

        let record = self.repository.insert(record).await?;

        info!(
            id = %id,
            name = %name,
            key_prefix = %generated.display_prefix,
            "API key generated"
        );

        Ok(GeneratedKey {
            secret: generated.key,
            record,
        })
    }

    /// Resolve a raw secret to its record, or `None`.
    ///
    /// Rejections (no match, disabled, expired, usage exhausted) all collapse
    /// to `None` so callers cannot distinguish why a key failed. Validation
    /// has no side effects; usage is metered by [`Self::increment_usage`].
    pub async fn validate(&self, secret: &str) -> Result<Option<ApiKeyRecord>, DomainError> {
        let hash = self.generator.hash_key(secret);

        let Some(record) = self.repository.find_by_hash(&hash).await? else {
            return Ok(None);
        };

        if !record.enabled() {
            debug!(id = %record.id(), "API key rejected: disabled");
            return Ok(None);
        }
        if record.is_expired() {
            debug!(id = %record.id(), "API key rejected: expired");
            return Ok(None);
        }
        if record.usage_exhausted() {
            debug!(id = %record.id(), "API key rejected: usage limit reached");
            return Ok(None);
        }

        Ok(Some(record))
    }

    /// Bump the usage counter and stamp the last-used time.
    ///
    /// Silent no-op when the id is unknown.
    pub async fn increment_usage(&self, id: &str) -> Result<(), DomainError> {
        if let Some(mut record) = self.repository.get(id).await? {
            record.record_usage();
            self.repository.update(&record).await?;
        }
        Ok(())
    }

    /// Get a record for display; the key hash is blanked
    pub async fn get(&self, id: &str) -> Result<Option<ApiKeyRecord>, DomainError> {
        Ok(self.repository.get(id).await?.map(|r| r.redacted()))
    }

    /// Get the unredacted record (revocation re-check during token auth)
    pub(crate) async fn get_raw(&self, id: &str) -> Result<Option<ApiKeyRecord>, DomainError> {
        self.repository.get(id).await
    }

    /// All records in insertion order, each with the key hash blanked
    pub async fn list(&self) -> Result<Vec<ApiKeyRecord>, DomainError> {
        Ok(self
            .repository
            .list()
            .await?
            .iter()
            .map(|r| r.redacted())
            .collect())
    }

    /// Hard-delete a key; returns whether it existed
    pub async fn revoke(&self, id: &str) -> Result<bool, DomainError> {
        let removed = self.repository.remove(id).await?;
        if removed {
            info!(id = %id, "API key revoked");
        }
        Ok(removed)
    }

    /// Flip the enabled flag; returns whether the record existed
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool, DomainError> {
        let Some(mut record) = self.repository.get(id).await? else {
            return Ok(false);
        };

        record.set_enabled(enabled);
        let updated = self.repository.update(&record).await?;

        if updated {
            info!(id = %id, enabled, "API key toggled");
        }
        Ok(updated)
    }

    /// Partial update of name, permissions, and usage limit
    pub async fn update(&self, id: &str, update: ApiKeyUpdate) -> Result<bool, DomainError> {
        let Some(mut record) = self.repository.get(id).await? else {
            return Ok(false);
        };

        if let Some(name) = update.name {
            record.set_name(name);
        }
        if let Some(permissions) = update.permissions {
            record.set_permissions(permissions);
        }
        if let Some(limit) = update.usage_limit {
            record.set_usage_limit(Some(limit));
        }

        self.repository.update(&record).await
    }
}

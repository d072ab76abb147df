//! API key record and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Flat permission strings understood by the gateway.
///
/// Permissions are opaque to the authorization layer except for
/// [`permissions::ADMIN`], which bypasses every specific check.
pub mod permissions {
    /// Read chat sessions and history
    pub const CHAT_READ: &str = "chat:read";
    /// Create and send chat messages
    pub const CHAT_WRITE: &str = "chat:write";
    /// Run agent tasks
    pub const AGENT_EXECUTE: &str = "agent:execute";
    /// Invoke MCP tools
    pub const MCP_EXECUTE: &str = "mcp:execute";
    /// Invoke skills
    pub const SKILL_EXECUTE: &str = "skill:execute";
    /// Super-permission bypassing all specific checks
    pub const ADMIN: &str = "admin";

    /// Permissions granted to newly generated keys when none are requested.
    pub fn default_set() -> Vec<String> {
        vec![CHAT_WRITE.to_string(), AGENT_EXECUTE.to_string()]
    }

    /// Check whether a granted set satisfies any of the required permissions.
    ///
    /// A grant of [`ADMIN`] satisfies every requirement. An empty required
    /// list is only satisfied by `admin`.
    pub fn grants_any(granted: &[String], required: &[&str]) -> bool {
        if granted.iter().any(|p| p == ADMIN) {
            return true;
        }
        required.iter().any(|r| granted.iter().any(|g| g == r))
    }
}

/// Options accepted when generating a new API key
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateOptions {
    /// Days until expiry; negative values produce an already-expired key
    pub expires_in_days: Option<i64>,
    /// Permissions to grant; defaults to [`permissions::default_set`]
    pub permissions: Option<Vec<String>>,
    /// Maximum number of successful validations
    pub usage_limit: Option<u64>,
}

/// Partial update of the mutable API key fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiKeyUpdate {
    pub name: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub usage_limit: Option<u64>,
}

/// One issued credential.
///
/// The full secret is never stored; `key_hash` is the only retained form and
/// is blanked on every record that leaves the manager (see
/// [`ApiKeyRecord::redacted`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// Unique identifier, immutable after creation
    id: String,
    /// Display name
    name: String,
    /// Truncated, non-secret display fragment of the full key
    key_prefix: String,
    /// Hex SHA-256 of the full secret
    key_hash: String,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Expiry timestamp (None = never expires)
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    /// Last successful use
    #[serde(skip_serializing_if = "Option::is_none")]
    last_used_at: Option<DateTime<Utc>>,
    /// Granted permissions, insertion order preserved for display
    permissions: Vec<String>,
    /// Disabled keys fail validation regardless of other fields
    enabled: bool,
    /// Count of successful validations, monotonic
    usage_count: u64,
    /// Validation cap (None = unlimited)
    #[serde(skip_serializing_if = "Option::is_none")]
    usage_limit: Option<u64>,
}

impl ApiKeyRecord {
    /// Create a new record with default permissions, enabled, no expiry
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        key_hash: impl Into<String>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            key_prefix: key_prefix.into(),
            key_hash: key_hash.into(),
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
            permissions: permissions::default_set(),
            enabled: true,
            usage_count: 0,
            usage_limit: None,
        }
    }

    /// Set expiry relative to now; negative day counts are permitted
    pub fn with_expiry_days(mut self, days: i64) -> Self {
        self.expires_at = Some(Utc::now() + Duration::days(days));
        self
    }

    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_usage_limit(mut self, limit: u64) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    // Getters

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn key_hash(&self) -> &str {
        &self.key_hash
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn usage_count(&self) -> u64 {
        self.usage_count
    }

    pub fn usage_limit(&self) -> Option<u64> {
        self.usage_limit
    }

    // Status checks

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }

    pub fn usage_exhausted(&self) -> bool {
        match self.usage_limit {
            Some(limit) => self.usage_count >= limit,
            None => false,
        }
    }

    /// Check enabled, then expiry, then usage limit
    pub fn is_valid(&self) -> bool {
        self.enabled && !self.is_expired() && !self.usage_exhausted()
    }

    // Mutators

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_permissions(&mut self, permissions: Vec<String>) {
        self.permissions = permissions;
    }

    pub fn set_usage_limit(&mut self, limit: Option<u64>) {
        self.usage_limit = limit;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Record a successful use: bump the counter, stamp `last_used_at`
    pub fn record_usage(&mut self) {
        self.usage_count += 1;
        self.last_used_at = Some(Utc::now());
    }

    /// Copy of this record with the key hash blanked.
    ///
    /// Every read/list exposure goes through this; the real hash stays
    /// inside the manager.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.key_hash = String::new();
        copy
    }
}

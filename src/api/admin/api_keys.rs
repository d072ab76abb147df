//! API key management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::api_key::{ApiKeyRecord, ApiKeyUpdate, GenerateOptions};

/// Request to create a new API key
#[derive(Debug, Clone, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    #[serde(default)]
    pub expires_in_days: Option<i64>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    #[serde(default)]
    pub usage_limit: Option<u64>,
}

/// Request to update the mutable API key fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateApiKeyRequest {
    pub name: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub usage_limit: Option<u64>,
}

/// API key response; carries no hash field at all
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyResponse {
    pub id: String,
    pub name: String,
    pub key_prefix: String,
    pub enabled: bool,
    pub permissions: Vec<String>,
    pub usage_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u64>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<String>,
}

impl From<&ApiKeyRecord> for ApiKeyResponse {
    fn from(record: &ApiKeyRecord) -> Self {
        Self {
            id: record.id().to_string(),
            name: record.name().to_string(),
            key_prefix: record.key_prefix().to_string(),
            enabled: record.enabled(),
            permissions: record.permissions().to_vec(),
            usage_count: record.usage_count(),
            usage_limit: record.usage_limit(),
            created_at: record.created_at().to_rfc3339(),
            expires_at: record.expires_at().map(|dt| dt.to_rfc3339()),
            last_used_at: record.last_used_at().map(|dt| dt.to_rfc3339()),
        }
    }
}

/// Creation response; the secret appears here exactly once
#[derive(Debug, Clone, Serialize)]
pub struct CreateApiKeyResponse {
    #[serde(flatten)]
    pub api_key: ApiKeyResponse,
    pub secret: String,
}

/// List response
#[derive(Debug, Clone, Serialize)]
pub struct ListApiKeysResponse {
    pub api_keys: Vec<ApiKeyResponse>,
    pub total: usize,
}

/// GET /admin/api-keys
pub async fn list_api_keys(
    State(state): State<AppState>,
) -> Result<Json<ListApiKeysResponse>, ApiError> {
    debug!("Listing API keys");

    let records = state.api_keys.list().await?;
    let api_keys: Vec<ApiKeyResponse> = records.iter().map(ApiKeyResponse::from).collect();
    let total = api_keys.len();

    Ok(Json(ListApiKeysResponse { api_keys, total }))
}

/// POST /admin/api-keys
pub async fn create_api_key(
    State(state): State<AppState>,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<CreateApiKeyResponse>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("Name must not be empty"));
    }

    let generated = state
        .api_keys
        .generate(
            request.name,
            GenerateOptions {
                expires_in_days: request.expires_in_days,
                permissions: request.permissions,
                usage_limit: request.usage_limit,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse {
            api_key: ApiKeyResponse::from(&generated.record.redacted()),
            secret: generated.secret,
        }),
    ))
}

/// GET /admin/api-keys/{key_id}
pub async fn get_api_key(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let record = state
        .api_keys
        .get(&key_id)
        .await?
        .ok_or_else(|| ApiError::not_found("API key not found"))?;

    Ok(Json(ApiKeyResponse::from(&record)))
}

/// PUT /admin/api-keys/{key_id}
pub async fn update_api_key(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
    Json(request): Json<UpdateApiKeyRequest>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let updated = state
        .api_keys
        .update(
            &key_id,
            ApiKeyUpdate {
                name: request.name,
                permissions: request.permissions,
                usage_limit: request.usage_limit,
            },
        )
        .await?;

    if !updated {
        return Err(ApiError::not_found("API key not found"));
    }

    let record = state
        .api_keys
        .get(&key_id)
        .await?
        .ok_or_else(|| ApiError::not_found("API key not found"))?;

    Ok(Json(ApiKeyResponse::from(&record)))
}

/// POST /admin/api-keys/{key_id}/enable
pub async fn enable_api_key(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    toggle(&state, &key_id, true).await
}

/// POST /admin/api-keys/{key_id}/disable
pub async fn disable_api_key(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    toggle(&state, &key_id, false).await
}

async fn toggle(state: &AppState, key_id: &str, enabled: bool) -> Result<StatusCode, ApiError> {
    if state.api_keys.set_enabled(key_id, enabled).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("API key not found"))
    }
}

/// DELETE /admin/api-keys/{key_id}
pub async fn revoke_api_key(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.api_keys.revoke(&key_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("API key not found"))
    }
}

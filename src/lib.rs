//! DeskAgent Gateway
//!
//! Local HTTP gateway for the DeskAgent desktop app:
//! - API key lifecycle management (issue, validate, revoke, meter)
//! - self-contained HMAC-SHA256 signed tokens
//! - authentication and permission middleware for the request pipeline

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::{info, warn};

use api::state::AppState;
use domain::api_key::{permissions, GenerateOptions};
use infrastructure::api_key::{ApiKeyManager, InMemoryApiKeyRepository};
use infrastructure::auth::{TokenCodec, TokenConfig};

/// Create the application state with all services initialized.
///
/// Without a configured `auth.token_secret`, a random signing secret is
/// generated here, which invalidates any token issued by a previous run.
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let repository = Arc::new(InMemoryApiKeyRepository::new());
    let api_keys = Arc::new(ApiKeyManager::new(repository));

    if config.auth.token_secret.is_none() {
        info!("No token secret configured; generating one for this process");
    }
    let tokens = Arc::new(TokenCodec::new(TokenConfig::from_secret(
        config.auth.token_secret.clone(),
        config.auth.token_ttl_secs,
    )));

    if config.auth.bootstrap_admin_key && api_keys.list().await?.is_empty() {
        bootstrap_admin_key(&api_keys).await?;
    }

    Ok(AppState::new(api_keys, tokens))
}

/// Issue the first admin key so the desktop shell can manage the rest.
///
/// The secret is printed once; it is not retrievable afterwards.
async fn bootstrap_admin_key(api_keys: &ApiKeyManager) -> anyhow::Result<()> {
    let generated = api_keys
        .generate(
            "Bootstrap Admin Key",
            GenerateOptions {
                permissions: Some(vec![permissions::ADMIN.to_string()]),
                ..Default::default()
            },
        )
        .await?;

    warn!(
        id = %generated.record.id(),
        "Bootstrap admin key created; the secret below is shown only once"
    );
    println!("DESKAGENT_ADMIN_KEY={}", generated.secret);

    Ok(())
}

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::admin;
use super::auth;
use super::health;
use super::middleware::{optional_auth, require_auth, require_permission};
use super::state::AppState;
use crate::domain::api_key::permissions;

/// Create the full application router.
///
/// Route groups, innermost layer listed last:
/// - public: health probes and token issuance
/// - optional auth: session introspection
/// - authenticated: identity echo
/// - admin: key management, behind authentication plus the `admin` gate
pub fn create_router(state: AppState) -> Router {
    let admin_routes = admin::create_admin_router()
        .route_layer(middleware::from_fn(require_permission(&[
            permissions::ADMIN,
        ])))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let authenticated = Router::new()
        .route("/auth/me", get(auth::me))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let session = Router::new()
        .route("/auth/session", get(auth::session))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .route("/auth/token", post(auth::issue_token))
        .merge(authenticated)
        .merge(session)
        .nest("/admin", admin_routes)
        .with_state(state)
        // the desktop renderer is a cross-origin client of this local server
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::{header, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::domain::api_key::GenerateOptions;
    use crate::infrastructure::api_key::{ApiKeyManager, GeneratedKey, InMemoryApiKeyRepository};
    use crate::infrastructure::auth::{TokenCodec, TokenConfig};

    fn test_state() -> AppState {
        let manager = Arc::new(ApiKeyManager::new(Arc::new(
            InMemoryApiKeyRepository::new(),
        )));
        let codec = Arc::new(TokenCodec::new(TokenConfig::new("test-signing-secret", 3600)));
        AppState::new(manager, codec)
    }

    async fn generate_key(state: &AppState, name: &str, permissions: &[&str]) -> GeneratedKey {
        state
            .api_keys
            .generate(
                name,
                GenerateOptions {
                    permissions: Some(permissions.iter().map(|p| p.to_string()).collect()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    fn get_request(uri: &str, bearer: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(uri);
        if let Some(credential) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", credential));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_request(uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request {
        let mut builder = Request::builder().uri(uri).method("POST");
        if let Some(credential) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", credential));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoints_are_public() {
        let router = create_router(test_state());

        for uri in ["/health", "/ready", "/live"] {
            let response = router.clone().oneshot(get_request(uri, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_missing_credential_is_rejected_with_exact_body() {
        let router = create_router(test_state());

        let response = router.oneshot(get_request("/auth/me", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "No token provided"})
        );
    }

    #[tokio::test]
    async fn test_garbage_credential_is_rejected_with_exact_body() {
        let router = create_router(test_state());

        let response = router
            .oneshot(get_request("/auth/me", Some("not-a-valid-credential")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Invalid token or API key"})
        );
    }

    #[tokio::test]
    async fn test_raw_api_key_authenticates_and_meters_usage() {
        let state = test_state();
        let generated = generate_key(&state, "Raw Key", &["chat:write"]).await;
        let router = create_router(state.clone());

        let response = router
            .oneshot(get_request("/auth/me", Some(&generated.secret)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let identity = body_json(response).await;
        assert_eq!(identity["sub"], generated.record.id());
        assert_eq!(identity["name"], "Raw Key");
        assert_eq!(identity["iss"], "deskagent");
        assert_eq!(identity["aud"], "deskagent-api");

        let record = state.api_keys.get(generated.record.id()).await.unwrap().unwrap();
        assert_eq!(record.usage_count(), 1);
    }

    #[tokio::test]
    async fn test_token_issuance_and_use() {
        let state = test_state();
        let generated = generate_key(&state, "Interactive", &["chat:write"]).await;
        let router = create_router(state.clone());

        let response = router
            .clone()
            .oneshot(post_request("/auth/token", Some(&generated.secret), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let issued = body_json(response).await;
        let token = issued["token"].as_str().unwrap().to_string();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(issued["key"]["id"], generated.record.id());
        assert!(issued["key"].get("key_hash").is_none());

        // the token authenticates via the Authorization header
        let response = router
            .clone()
            .oneshot(get_request("/auth/me", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // and via the query parameter fallback
        let response = router
            .oneshot(get_request(&format!("/auth/me?token={}", token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_token_for_revoked_key_is_rejected() {
        let state = test_state();
        let generated = generate_key(&state, "Doomed", &["chat:write"]).await;
        let token = state.tokens.generate(&generated.record).unwrap();
        let router = create_router(state.clone());

        assert!(state.api_keys.revoke(generated.record.id()).await.unwrap());

        let response = router
            .oneshot(get_request("/auth/me", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "API key revoked or disabled"})
        );
    }

    #[tokio::test]
    async fn test_token_for_disabled_key_is_rejected() {
        let state = test_state();
        let generated = generate_key(&state, "Paused", &["chat:write"]).await;
        let token = state.tokens.generate(&generated.record).unwrap();
        let router = create_router(state.clone());

        assert!(state
            .api_keys
            .set_enabled(generated.record.id(), false)
            .await
            .unwrap());

        let response = router
            .oneshot(get_request("/auth/me", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "API key revoked or disabled"})
        );
    }

    #[tokio::test]
    async fn test_admin_routes_require_admin_permission() {
        let state = test_state();
        let plain = generate_key(&state, "Plain", &["chat:write"]).await;
        let admin = generate_key(&state, "Admin", &["admin"]).await;
        let router = create_router(state);

        let response = router
            .clone()
            .oneshot(get_request("/admin/api-keys", Some(&plain.secret)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Insufficient permissions"})
        );

        let response = router
            .oneshot(get_request("/admin/api-keys", Some(&admin.secret)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_list_is_redacted() {
        let state = test_state();
        let admin = generate_key(&state, "Admin", &["admin"]).await;
        generate_key(&state, "Other", &["chat:write"]).await;
        let router = create_router(state);

        let response = router
            .oneshot(get_request("/admin/api-keys", Some(&admin.secret)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let listed = body_json(response).await;
        assert_eq!(listed["total"], 2);
        for key in listed["api_keys"].as_array().unwrap() {
            assert!(key.get("key_hash").is_none());
            assert!(key.get("secret").is_none());
            assert!(key["key_prefix"].as_str().unwrap().ends_with("..."));
        }
    }

    #[tokio::test]
    async fn test_admin_create_returns_secret_once() {
        let state = test_state();
        let admin = generate_key(&state, "Admin", &["admin"]).await;
        let router = create_router(state.clone());

        let response = router
            .oneshot(post_request(
                "/admin/api-keys",
                Some(&admin.secret),
                Some(serde_json::json!({
                    "name": "Integration",
                    "permissions": ["mcp:execute"],
                    "usage_limit": 100
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let created = body_json(response).await;
        let secret = created["secret"].as_str().unwrap();
        assert!(secret.starts_with("sk_"));
        assert_eq!(created["permissions"], serde_json::json!(["mcp:execute"]));

        // the returned secret round-trips through validation
        let validated = state.api_keys.validate(secret).await.unwrap().unwrap();
        assert_eq!(validated.id(), created["id"].as_str().unwrap());
    }

    #[tokio::test]
    async fn test_admin_revoke_invalidates_key() {
        let state = test_state();
        let admin = generate_key(&state, "Admin", &["admin"]).await;
        let victim = generate_key(&state, "Victim", &["chat:write"]).await;
        let router = create_router(state.clone());

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/admin/api-keys/{}", victim.record.id()))
                    .method("DELETE")
                    .header(header::AUTHORIZATION, format!("Bearer {}", admin.secret))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        assert!(state.api_keys.validate(&victim.secret).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_endpoint_never_rejects() {
        let state = test_state();
        let generated = generate_key(&state, "Session", &["chat:write"]).await;
        let token = state.tokens.generate(&generated.record).unwrap();
        let router = create_router(state);

        let response = router
            .clone()
            .oneshot(get_request("/auth/session", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["authenticated"], false);

        let response = router
            .clone()
            .oneshot(get_request("/auth/session", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let session = body_json(response).await;
        assert_eq!(session["authenticated"], true);
        assert_eq!(session["identity"]["sub"], generated.record.id());

        // an invalid credential is simply anonymous here
        let response = router
            .oneshot(get_request("/auth/session", Some("garbage")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["authenticated"], false);
    }

    #[tokio::test]
    async fn test_permission_pipeline_end_to_end() {
        let state = test_state();
        let generated = generate_key(&state, "Writer", &["chat:write"]).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let handler_calls = calls.clone();
        let protected = Router::new()
            .route(
                "/v1/messages",
                post(move || {
                    let calls = handler_calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        StatusCode::OK
                    }
                }),
            )
            .route_layer(middleware::from_fn(require_permission(&["chat:write"])))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state.clone());

        let response = protected
            .clone()
            .oneshot(post_request("/v1/messages", Some(&generated.secret), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // the same key fails an admin-gated route with 403
        let admin_gated = Router::new()
            .route("/v1/messages", post(|| async { StatusCode::OK }))
            .route_layer(middleware::from_fn(require_permission(&["admin"])))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state);

        let response = admin_gated
            .oneshot(post_request("/v1/messages", Some(&generated.secret), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permission_gate_without_auth_layer_is_unauthorized() {
        let router = Router::new()
            .route("/protected", get(|| async { StatusCode::OK }))
            .route_layer(middleware::from_fn(require_permission(&["chat:write"])));

        let response = router
            .oneshot(get_request("/protected", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Authentication required"})
        );
    }

    #[tokio::test]
    async fn test_exhausted_key_is_rejected() {
        let state = test_state();
        let generated = state
            .api_keys
            .generate(
                "Metered",
                GenerateOptions {
                    usage_limit: Some(1),
                    permissions: Some(vec!["chat:write".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let router = create_router(state);

        let response = router
            .clone()
            .oneshot(get_request("/auth/me", Some(&generated.secret)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // limit reached; the same key now fails with the generic body
        let response = router
            .oneshot(get_request("/auth/me", Some(&generated.secret)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Invalid token or API key"})
        );
    }
}

//! Server setup and routing.

use crate::{
    auth::{api as auth_api, auth_middleware, AuthState, JwtHandler, UserStore},
    config::Config,
    generation::{
        api as generation_api, CompletionService, GenerationState, HubLoader, ModelManager,
    },
    middleware::request_logging,
};
use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Create the API router with all routes.
///
/// The auth gate wraps only the protected routes; `/token`, `/register`,
/// and `/health` stay public.
pub fn create_router(auth_state: AuthState, generation_state: GenerationState) -> Router {
    let auth_routes = Router::new()
        .route("/token", post(auth_api::login))
        .route("/register", post(auth_api::register))
        .with_state(auth_state.clone());

    let protected_routes = Router::new()
        .route("/users/me", get(auth_api::get_current_user))
        .route("/v1/completions", post(generation_api::create_completion))
        .route("/v1/models", get(generation_api::list_models))
        .route_layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(generation_state.clone());

    let public_routes = Router::new()
        .route("/health", get(generation_api::health_check))
        .with_state(generation_state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(auth_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

/// Wire up application state from configuration.
pub fn build_state(config: &Config) -> Result<(AuthState, GenerationState)> {
    let user_store = Arc::new(UserStore::new());
    user_store.seed_admin(&config.admin_username, &config.admin_password)?;

    let jwt_handler = Arc::new(JwtHandler::new(
        config.jwt_secret.clone(),
        &config.jwt_algorithm,
        config.token_expire_minutes,
    )?);

    let auth_state = AuthState {
        user_store,
        jwt_handler,
    };

    let loader = Arc::new(HubLoader::new(
        config.inference_url(),
        config.model_name.clone(),
        config.model_id.clone(),
        config.hub_api_token.clone(),
        Duration::from_secs(config.generation_timeout_secs),
    )?);
    let manager = Arc::new(ModelManager::new(loader));
    let service = Arc::new(CompletionService::new(
        manager.clone(),
        config.max_concurrent_generations,
        config.max_tokens_ceiling,
        config.default_max_tokens,
        config.default_temperature,
        Duration::from_secs(config.generation_timeout_secs),
    ));

    let generation_state = GenerationState {
        service,
        manager,
        model_id: config.model_id.clone(),
        model_name: config.model_name.clone(),
    };

    Ok((auth_state, generation_state))
}

/// Run the HTTP server until shutdown.
pub async fn run(config: Config) -> Result<()> {
    let (auth_state, generation_state) = build_state(&config)?;
    let app = create_router(auth_state, generation_state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🎯 API server listening on {}", addr);
    info!("📖 Serving model: {}", config.model_name);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

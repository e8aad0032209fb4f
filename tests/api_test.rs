//! End-to-end API tests against the assembled router.
//!
//! Uses a mock generator behind the real lifecycle manager so the full
//! auth + orchestration path runs without a model hub.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use std::time::Duration;
use tower::ServiceExt;

use textgen_backend::{
    auth::{AuthState, JwtHandler, UserStore},
    generation::{
        generator::{GeneratedText, GenerationParams, Generator, GeneratorError, GeneratorLoader},
        schemas::FinishReason,
        CompletionService, GenerationState, ModelManager,
    },
    server::create_router,
};

struct MockGenerator {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Generator for MockGenerator {
    fn model_id(&self) -> &str {
        "tinyllama-1.1b"
    }

    async fn generate(
        &self,
        _prompt: &str,
        params: &GenerationParams,
    ) -> Result<GeneratedText, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedText {
            text: "Bonjour, comment allez-vous?".to_string(),
            prompt_tokens: 10,
            completion_tokens: params.max_new_tokens.min(8),
            finish_reason: FinishReason::Stop,
        })
    }
}

struct MockLoader {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl GeneratorLoader for MockLoader {
    async fn load(&self) -> Result<Arc<dyn Generator>, GeneratorError> {
        Ok(Arc::new(MockGenerator {
            calls: self.calls.clone(),
        }))
    }
}

/// Build the full router with a mock model backend.
/// Returns the router and the generator call counter.
fn test_app() -> (Router, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));

    let user_store = Arc::new(UserStore::new());
    user_store.seed_admin("admin", "admin").unwrap();
    let jwt_handler = Arc::new(JwtHandler::new("test-secret".to_string(), "HS256", 30).unwrap());
    let auth_state = AuthState {
        user_store,
        jwt_handler,
    };

    let manager = Arc::new(ModelManager::new(Arc::new(MockLoader {
        calls: calls.clone(),
    })));
    let service = Arc::new(CompletionService::new(
        manager.clone(),
        1,
        2048,
        200,
        0.7,
        Duration::from_secs(30),
    ));
    let generation_state = GenerationState {
        service,
        manager,
        model_id: "tinyllama-1.1b".to_string(),
        model_name: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_string(),
    };

    (create_router(auth_state, generation_state), calls)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register(app: &Router, username: &str, password: &str) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "username": username, "password": password }).to_string(),
        ))
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

async fn obtain_token(app: &Router, username: &str, password: &str) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "username={}&password={}&grant_type=password",
            username, password
        )))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_login_me_and_complete() {
    let (app, _) = test_app();

    assert_eq!(register(&app, "alice", "Secret123!").await, StatusCode::CREATED);
    let token = obtain_token(&app, "alice", "Secret123!").await;

    // GET /users/me with the bearer token
    let request = Request::builder()
        .uri("/users/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["username"], "alice");
    assert_eq!(me["disabled"], false);
    assert!(me.get("password_hash").is_none());

    // POST /v1/completions
    let request = Request::builder()
        .method("POST")
        .uri("/v1/completions")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "prompt": "Hello",
                "max_tokens": 10,
                "model": "tinyllama-1.1b",
                "temperature": 0.7
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let completion = body_json(response).await;
    assert!(completion["id"].as_str().unwrap().starts_with("cmpl-"));
    assert_eq!(completion["object"], "text_completion");
    assert_eq!(completion["model"], "tinyllama-1.1b");
    assert!(!completion["choices"][0]["text"].as_str().unwrap().is_empty());
    assert_eq!(completion["choices"][0]["index"], 0);

    let usage = &completion["usage"];
    assert!(usage["total_tokens"].as_u64().unwrap() >= usage["prompt_tokens"].as_u64().unwrap());
    assert_eq!(
        usage["total_tokens"].as_u64().unwrap(),
        usage["prompt_tokens"].as_u64().unwrap() + usage["completion_tokens"].as_u64().unwrap()
    );
}

#[tokio::test]
async fn test_completions_without_auth_never_reaches_generator() {
    let (app, calls) = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/v1/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "prompt": "Hello", "model": "tinyllama-1.1b" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let (app, calls) = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/v1/completions")
        .header(header::AUTHORIZATION, "Bearer not.a.token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "prompt": "Hello", "model": "tinyllama-1.1b" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let (app, _) = test_app();

    assert_eq!(register(&app, "bob", "Secret123!").await, StatusCode::CREATED);
    assert_eq!(register(&app, "bob", "Secret123!").await, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_weak_password_rejected() {
    let (app, _) = test_app();
    assert_eq!(register(&app, "carol", "weak").await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let (app, _) = test_app();
    register(&app, "alice", "Secret123!").await;

    let request = Request::builder()
        .method("POST")
        .uri("/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=alice&password=wrong&grant_type=password"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_max_tokens_over_ceiling_is_bad_request() {
    let (app, _) = test_app();
    register(&app, "alice", "Secret123!").await;
    let token = obtain_token(&app, "alice", "Secret123!").await;

    let request = Request::builder()
        .method("POST")
        .uri("/v1/completions")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "prompt": "Hello",
                "max_tokens": 999999,
                "model": "tinyllama-1.1b"
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn test_models_requires_auth_and_lists_configured_model() {
    let (app, _) = test_app();

    let request = Request::builder().uri("/v1/models").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = obtain_token(&app, "admin", "admin").await;
    let request = Request::builder()
        .uri("/v1/models")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"][0]["id"], "tinyllama-1.1b");
}

#[tokio::test]
async fn test_health_is_public_and_reflects_model_state() {
    let (app, _) = test_app();

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_state"], "uninitialized");
}

#[tokio::test]
async fn test_empty_prompt_is_bad_request() {
    let (app, calls) = test_app();
    let token = obtain_token(&app, "admin", "admin").await;

    let request = Request::builder()
        .method("POST")
        .uri("/v1/completions")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "prompt": "   ", "model": "tinyllama-1.1b" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

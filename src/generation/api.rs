//! Generation API Endpoints
//! Mission: Expose completions, model listing, and health over HTTP

use crate::auth::middleware::CurrentUser;
use crate::generation::{
    lifecycle::{ModelManager, ModelState},
    schemas::{CompletionRequest, CompletionResponse},
    service::{CompletionError, CompletionService},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared state for generation routes.
#[derive(Clone)]
pub struct GenerationState {
    pub service: Arc<CompletionService>,
    pub manager: Arc<ModelManager>,
    pub model_id: String,
    pub model_name: String,
}

/// Create a text completion - POST /v1/completions
pub async fn create_completion(
    State(state): State<GenerationState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<CompletionRequest>,
) -> Result<Json<CompletionResponse>, CompletionError> {
    let response = state.service.complete(request, &user).await?;
    Ok(Json(response))
}

/// List available models - GET /v1/models
pub async fn list_models(State(state): State<GenerationState>) -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [
            {
                "id": state.model_id,
                "object": "model",
                "owned_by": "default",
                "permission": [],
            }
        ]
    }))
}

/// Health check - GET /health (no auth)
///
/// Always answers; the body reflects the model lifecycle so a failed load
/// shows up as degraded rather than a dead process.
pub async fn health_check(State(state): State<GenerationState>) -> Json<Value> {
    let model_state = state.manager.state();
    let status = match model_state {
        ModelState::Failed(_) => "degraded",
        _ => "ok",
    };

    Json(json!({
        "status": status,
        "model": state.model_name,
        "model_state": model_state.as_str(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

impl IntoResponse for CompletionError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            CompletionError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error", msg)
            }
            CompletionError::ModelUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "server_error",
                "Text generation model is unavailable".to_string(),
            ),
            CompletionError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "server_error",
                "Generation did not complete within the time budget".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type,
                "param": null,
                "code": null,
            }
        }));

        (status, body).into_response()
    }
}

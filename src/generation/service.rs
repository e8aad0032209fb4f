//! Generation Orchestrator
//! Mission: Turn a validated request into a bounded, accounted completion

use crate::auth::models::User;
use crate::generation::{
    generator::GenerationParams,
    lifecycle::ModelManager,
    schemas::{CompletionRequest, CompletionResponse},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

const MAX_PROMPT_CHARS: usize = 4096;
const MAX_STOP_SEQUENCES: usize = 4;
const MAX_STOP_SEQUENCE_CHARS: usize = 50;

/// Completion failure taxonomy.
///
/// Infrastructure causes are logged in full where they occur and surfaced
/// here without internal detail.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("text generation model is unavailable")]
    ModelUnavailable,

    #[error("generation timed out")]
    Timeout,
}

/// Request orchestration policy for `/v1/completions`.
pub struct CompletionService {
    manager: Arc<ModelManager>,
    /// Serializes (or bounds) generation calls; waiting callers queue.
    gate: Semaphore,
    max_tokens_ceiling: u32,
    default_max_tokens: u32,
    default_temperature: f32,
    timeout: Duration,
}

impl CompletionService {
    pub fn new(
        manager: Arc<ModelManager>,
        max_concurrent: usize,
        max_tokens_ceiling: u32,
        default_max_tokens: u32,
        default_temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            manager,
            gate: Semaphore::new(max_concurrent),
            max_tokens_ceiling,
            default_max_tokens,
            default_temperature,
            timeout,
        }
    }

    /// Generate one completion for an authenticated caller.
    pub async fn complete(
        &self,
        request: CompletionRequest,
        caller: &User,
    ) -> Result<CompletionResponse, CompletionError> {
        let params = self.validate(&request)?;

        let generator = self.manager.ensure_ready().await.map_err(|e| {
            error!("Model unavailable for {}: {}", caller.username, e);
            CompletionError::ModelUnavailable
        })?;

        info!("Generating completion for user: {}", caller.username);

        // Queue behind in-flight generations rather than failing.
        let _permit = self.gate.acquire().await.map_err(|_| {
            error!("Generation gate closed unexpectedly");
            CompletionError::ModelUnavailable
        })?;

        let generated = match tokio::time::timeout(
            self.timeout,
            generator.generate(request.prompt.trim(), &params),
        )
        .await
        {
            Ok(Ok(generated)) => generated,
            Ok(Err(e)) => {
                error!("Completion generation failed: {}", e);
                return Err(CompletionError::ModelUnavailable);
            }
            Err(_) => {
                warn!(
                    "Generation exceeded the {}s budget for user {}",
                    self.timeout.as_secs(),
                    caller.username
                );
                return Err(CompletionError::Timeout);
            }
        };

        info!(
            prompt_tokens = generated.prompt_tokens,
            completion_tokens = generated.completion_tokens,
            "Completion produced"
        );

        Ok(CompletionResponse::single(
            request.model,
            generated.text,
            generated.prompt_tokens,
            generated.completion_tokens,
            generated.finish_reason,
        ))
    }

    /// Validate request fields beyond basic typing. Out-of-range values are
    /// rejected, never clamped.
    fn validate(&self, request: &CompletionRequest) -> Result<GenerationParams, CompletionError> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(CompletionError::InvalidRequest(
                "prompt must not be empty".to_string(),
            ));
        }
        // Limits are in characters, matching the error messages; byte
        // length would over-count multibyte text.
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(CompletionError::InvalidRequest(format!(
                "prompt must not exceed {} characters",
                MAX_PROMPT_CHARS
            )));
        }

        let max_new_tokens = request.max_tokens.unwrap_or(self.default_max_tokens);
        if max_new_tokens == 0 {
            return Err(CompletionError::InvalidRequest(
                "max_tokens must be a positive integer".to_string(),
            ));
        }
        if max_new_tokens > self.max_tokens_ceiling {
            return Err(CompletionError::InvalidRequest(format!(
                "max_tokens must not exceed {}",
                self.max_tokens_ceiling
            )));
        }

        let temperature = request.temperature.unwrap_or(self.default_temperature);
        if !(0.0..=1.0).contains(&temperature) {
            return Err(CompletionError::InvalidRequest(
                "temperature must be between 0 and 1".to_string(),
            ));
        }

        if request.n.unwrap_or(1) != 1 {
            return Err(CompletionError::InvalidRequest(
                "n must be 1: only a single completion choice is supported".to_string(),
            ));
        }

        let stop = request.stop.clone().unwrap_or_default();
        if stop.len() > MAX_STOP_SEQUENCES {
            return Err(CompletionError::InvalidRequest(format!(
                "stop accepts at most {} sequences",
                MAX_STOP_SEQUENCES
            )));
        }
        if stop.iter().any(|s| s.chars().count() > MAX_STOP_SEQUENCE_CHARS) {
            return Err(CompletionError::InvalidRequest(format!(
                "stop sequences must be at most {} characters",
                MAX_STOP_SEQUENCE_CHARS
            )));
        }

        Ok(GenerationParams {
            max_new_tokens,
            temperature,
            stop,
        })
    }
}

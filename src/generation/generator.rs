//! Generator Backend
//! Mission: Abstract the model + tokenizer pairing behind a narrow trait

use crate::generation::schemas::FinishReason;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Parameters forwarded to the generator for one call.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub stop: Vec<String>,
}

/// One generated continuation with ground-truth token accounting.
///
/// Token counts come from the generator's own tokenizer, never estimated
/// from whitespace.
#[derive(Debug, Clone)]
pub struct GeneratedText {
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GeneratorError {
    #[error("model load failed: {0}")]
    Load(String),

    #[error("generation failed: {0}")]
    Inference(String),
}

/// The black-box text generation capability.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_id(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<GeneratedText, GeneratorError>;
}

/// Produces a ready generator. Split from [`Generator`] so the lifecycle
/// manager can own loading and tests can count load attempts.
#[async_trait]
pub trait GeneratorLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn Generator>, GeneratorError>;
}

// ---------------------------------------------------------------------------
// Hub-backed implementation (text-generation-inference wire format)
// ---------------------------------------------------------------------------

/// Generator backed by a hosted text-generation-inference endpoint.
pub struct HubGenerator {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
    api_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct HubRequest<'a> {
    inputs: &'a str,
    parameters: HubParameters<'a>,
}

#[derive(Debug, Serialize)]
struct HubParameters<'a> {
    max_new_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    do_sample: bool,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    stop: &'a [String],
    return_full_text: bool,
    details: bool,
    decoder_input_details: bool,
}

#[derive(Debug, Deserialize)]
struct HubResponse {
    generated_text: String,
    details: HubDetails,
}

#[derive(Debug, Deserialize)]
struct HubDetails {
    finish_reason: String,
    generated_tokens: u32,
    #[serde(default)]
    prefill: Vec<serde_json::Value>,
}

impl HubGenerator {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        model_id: String,
        api_token: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint,
            model_id,
            api_token,
        }
    }

    /// Wrap the raw prompt in the chat template the model was tuned on.
    fn format_prompt(prompt: &str) -> String {
        format!(
            "<|system|>You are a helpful AI assistant.\n<|user|>{}\n<|assistant|>",
            prompt
        )
    }
}

#[async_trait]
impl Generator for HubGenerator {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<GeneratedText, GeneratorError> {
        let formatted = Self::format_prompt(prompt);
        // TGI rejects temperature == 0; greedy decoding is expressed by
        // disabling sampling instead.
        let sampling = params.temperature > 0.0;
        let body = HubRequest {
            inputs: &formatted,
            parameters: HubParameters {
                max_new_tokens: params.max_new_tokens,
                temperature: sampling.then_some(params.temperature),
                do_sample: sampling,
                stop: &params.stop,
                return_full_text: false,
                details: true,
                decoder_input_details: true,
            },
        };

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| GeneratorError::Inference(format!("endpoint unreachable: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(GeneratorError::Inference(format!(
                "endpoint returned {}: {}",
                status, detail
            )));
        }

        // Hosted inference wraps the result in a one-element array; dedicated
        // TGI deployments return the bare object. Accept both.
        let raw = resp
            .bytes()
            .await
            .map_err(|e| GeneratorError::Inference(format!("failed to read response: {}", e)))?;
        let parsed: HubResponse = match serde_json::from_slice::<Vec<HubResponse>>(&raw) {
            Ok(mut v) if !v.is_empty() => v.remove(0),
            Ok(_) => {
                return Err(GeneratorError::Inference(
                    "empty response array".to_string(),
                ))
            }
            Err(_) => serde_json::from_slice(&raw)
                .map_err(|e| GeneratorError::Inference(format!("malformed response: {}", e)))?,
        };

        let finish_reason = match parsed.details.finish_reason.as_str() {
            "length" => FinishReason::Length,
            _ => FinishReason::Stop, // eos_token, stop_sequence
        };

        debug!(
            prompt_tokens = parsed.details.prefill.len(),
            completion_tokens = parsed.details.generated_tokens,
            "Generation round trip complete"
        );

        Ok(GeneratedText {
            text: parsed.generated_text.trim_start().to_string(),
            prompt_tokens: parsed.details.prefill.len() as u32,
            completion_tokens: parsed.details.generated_tokens,
            finish_reason,
        })
    }
}

/// Loads a [`HubGenerator`] after probing the endpoint once for
/// reachability and credential validity.
pub struct HubLoader {
    client: reqwest::Client,
    endpoint: String,
    model_name: String,
    model_id: String,
    api_token: Option<String>,
}

impl HubLoader {
    pub fn new(
        endpoint: String,
        model_name: String,
        model_id: String,
        api_token: Option<String>,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build hub HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            model_name,
            model_id,
            api_token,
        })
    }
}

#[async_trait]
impl GeneratorLoader for HubLoader {
    async fn load(&self) -> Result<Arc<dyn Generator>, GeneratorError> {
        info!("📦 Loading model backend: {}", self.model_name);

        let mut req = self.client.get(&self.endpoint);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| GeneratorError::Load(format!("hub unreachable: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GeneratorError::Load(
                "hub rejected the configured credential".to_string(),
            ));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(GeneratorError::Load(format!(
                "model {} not found on the hub",
                self.model_name
            )));
        }
        // Generate-only endpoints answer GET with 405; that still proves
        // the endpoint is alive and the credential was accepted.

        info!("✅ Model backend ready: {}", self.model_name);
        Ok(Arc::new(HubGenerator::new(
            self.client.clone(),
            self.endpoint.clone(),
            self.model_id.clone(),
            self.api_token.clone(),
        )))
    }
}

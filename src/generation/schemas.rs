//! Completion Schemas
//! Mission: OpenAI-compatible request/response envelopes for text completion

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    /// Natural stop condition (EOS or a stop sequence).
    Stop,
    /// Truncated by the max_tokens ceiling.
    Length,
}

/// OpenAI-style completion request.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionRequest {
    /// Model name to use for completion.
    pub model: String,
    /// The prompt to generate a completion for.
    pub prompt: String,
    /// Maximum number of tokens to generate.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Sampling temperature in [0, 1].
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Number of completions. Only 1 is supported.
    #[serde(default)]
    pub n: Option<u32>,
    /// Sequences where generation stops (max 4, each up to 50 chars).
    #[serde(default)]
    pub stop: Option<Vec<String>>,
}

/// Single completion choice in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub text: String,
    pub index: u32,
    pub finish_reason: FinishReason,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// OpenAI-style completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
    pub usage: Usage,
}

impl CompletionResponse {
    /// Assemble the single-choice envelope. `total_tokens` is always
    /// recomputed here, never trusted from the generator.
    pub fn single(
        model: String,
        text: String,
        prompt_tokens: u32,
        completion_tokens: u32,
        finish_reason: FinishReason,
    ) -> Self {
        Self {
            id: format!("cmpl-{}", Uuid::new_v4()),
            object: "text_completion".to_string(),
            created: Utc::now().timestamp(),
            model,
            choices: vec![CompletionChoice {
                text,
                index: 0,
                finish_reason,
            }],
            usage: Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_response_shape() {
        let resp = CompletionResponse::single(
            "tinyllama-1.1b".to_string(),
            "Bonjour".to_string(),
            10,
            8,
            FinishReason::Stop,
        );

        assert!(resp.id.starts_with("cmpl-"));
        assert_eq!(resp.object, "text_completion");
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(resp.choices[0].index, 0);
        assert_eq!(resp.usage.total_tokens, 18);
    }

    #[test]
    fn test_usage_invariant_recomputed() {
        let resp =
            CompletionResponse::single("m".to_string(), String::new(), 3, 0, FinishReason::Length);
        assert_eq!(
            resp.usage.total_tokens,
            resp.usage.prompt_tokens + resp.usage.completion_tokens
        );
    }

    #[test]
    fn test_finish_reason_serialization() {
        assert_eq!(
            serde_json::to_string(&FinishReason::Stop).unwrap(),
            r#""stop""#
        );
        assert_eq!(
            serde_json::to_string(&FinishReason::Length).unwrap(),
            r#""length""#
        );
    }

    #[test]
    fn test_request_optional_fields_default() {
        let req: CompletionRequest = serde_json::from_str(
            r#"{"model": "tinyllama-1.1b", "prompt": "Hello"}"#,
        )
        .unwrap();
        assert!(req.max_tokens.is_none());
        assert!(req.temperature.is_none());
        assert!(req.n.is_none());
        assert!(req.stop.is_none());
    }
}

//! Service Configuration
//! Mission: Load and validate all runtime settings from the environment

use anyhow::{bail, Result};
use std::env;

/// Runtime configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Hub identifier of the model served (e.g. "TinyLlama/TinyLlama-1.1B-Chat-v1.0").
    pub model_name: String,
    /// Short model id reported by the API (e.g. "tinyllama-1.1b").
    pub model_id: String,
    /// Optional explicit inference endpoint. Defaults to the hub's hosted
    /// inference URL for `model_name`.
    pub model_endpoint: Option<String>,
    /// Hard ceiling on `max_tokens` per request.
    pub max_tokens_ceiling: u32,
    /// Default `max_tokens` when the request omits it.
    pub default_max_tokens: u32,
    /// Default sampling temperature when the request omits it.
    pub default_temperature: f32,
    /// Credential for the model hub, if the model requires one.
    pub hub_api_token: Option<String>,
    /// Secret key for signing access tokens. Startup fails without it.
    pub jwt_secret: String,
    /// JWT signing algorithm name ("HS256", "HS384", "HS512").
    pub jwt_algorithm: String,
    /// Access token lifetime in minutes.
    pub token_expire_minutes: i64,
    /// Maximum generation calls in flight at once.
    pub max_concurrent_generations: usize,
    /// Per-request generation time budget in seconds.
    pub generation_timeout_secs: u64,
    /// Seed admin credentials, created at startup if absent.
    pub admin_username: String,
    pub admin_password: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let jwt_secret = match env::var("JWT_SECRET_KEY") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => bail!("JWT_SECRET_KEY environment variable is not set"),
        };

        let jwt_algorithm = env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string());

        let token_expire_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(30);

        let model_name = env::var("APP_MODEL_NAME")
            .unwrap_or_else(|_| "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_string());

        let model_id = env::var("APP_MODEL_ID").unwrap_or_else(|_| "tinyllama-1.1b".to_string());

        let model_endpoint = env::var("APP_MODEL_ENDPOINT")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let max_tokens_ceiling = env::var("APP_MAX_TOKENS_CEILING")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(2048);

        let default_max_tokens = env::var("APP_DEFAULT_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(200)
            .min(max_tokens_ceiling);

        let default_temperature = env::var("APP_DEFAULT_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|&v| (0.0..=1.0).contains(&v))
            .unwrap_or(0.7);

        let hub_api_token = env::var("HF_API_TOKEN")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let max_concurrent_generations = env::var("APP_MAX_CONCURRENT_GENERATIONS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(1);

        let generation_timeout_secs = env::var("APP_GENERATION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(120);

        let admin_username = env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let admin_password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());

        let host = env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .unwrap_or(8000);

        Ok(Self {
            model_name,
            model_id,
            model_endpoint,
            max_tokens_ceiling,
            default_max_tokens,
            default_temperature,
            hub_api_token,
            jwt_secret,
            jwt_algorithm,
            token_expire_minutes,
            max_concurrent_generations,
            generation_timeout_secs,
            admin_username,
            admin_password,
            host,
            port,
        })
    }

    /// Resolved inference endpoint for the configured model.
    pub fn inference_url(&self) -> String {
        match &self.model_endpoint {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "https://api-inference.huggingface.co/models/{}",
                self.model_name
            ),
        }
    }
}

//! # Interpreter Configuration Module
//!
//! Settings for the AI-assisted interpretation path: which OpenAI-compatible
//! endpoint to call, with which model and credentials, and how long to wait.
//!
//! An interpreter without an `AiConfig` runs the rule-based fallback only, so
//! `AiConfig::from_env` returns `Ok(None)` when nothing is configured.

use crate::interpreter::error::InterpretError;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f64 = 0.1;

/// Default completion token budget
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Groq's OpenAI-compatible API root
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Model used with Groq when none is configured
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Configuration for the AI provider
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// API root; requests go to `{base_url}/chat/completions`
    pub base_url: String,

    /// Model name sent with each request
    pub model: String,

    /// Bearer token. Local endpoints often need none.
    pub api_key: Option<String>,

    /// Upper bound on a single request
    pub timeout: Duration,
    pub temperature: f64,
    pub max_tokens: u32,

    /// Local quota on AI calls; unlimited when unset
    pub requests_per_minute: Option<NonZeroU32>,
}

impl AiConfig {
    /// Create a new builder
    pub fn builder(base_url: impl Into<String>, model: impl Into<String>) -> AiConfigBuilder {
        AiConfigBuilder::new(base_url, model)
    }

    /// Full URL of the chat completions endpoint
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Read the configuration from the process environment.
    ///
    /// `LECTERN_AI_BASE_URL` and `LECTERN_AI_MODEL` select an endpoint, with an
    /// optional `LECTERN_AI_API_KEY`. Failing that, `GROQ_API_KEY` alone selects
    /// Groq. `LECTERN_AI_TIMEOUT_SECS` and `LECTERN_AI_REQUESTS_PER_MINUTE` apply
    /// to either.
    pub fn from_env() -> Result<Option<Self>, InterpretError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AiConfig::from_env`] over an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, InterpretError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut builder = match (var("LECTERN_AI_BASE_URL"), var("LECTERN_AI_MODEL")) {
            (Some(base_url), Some(model)) => {
                let builder = AiConfig::builder(base_url, model);
                match var("LECTERN_AI_API_KEY") {
                    Some(key) => builder.api_key(key),
                    None => builder,
                }
            }
            (Some(_), None) => {
                return Err(InterpretError::Config(
                    "LECTERN_AI_MODEL must be set together with LECTERN_AI_BASE_URL".to_string(),
                ));
            }
            (None, model) => match var("GROQ_API_KEY") {
                Some(key) => AiConfig::builder(
                    GROQ_BASE_URL,
                    model.unwrap_or_else(|| GROQ_DEFAULT_MODEL.to_string()),
                )
                .api_key(key),
                None => {
                    if model.is_some() {
                        warn!(
                            "LECTERN_AI_MODEL is ignored without LECTERN_AI_BASE_URL or GROQ_API_KEY"
                        );
                    }
                    return Ok(None);
                }
            },
        };

        if let Some(secs) = var("LECTERN_AI_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                InterpretError::Config(format!("Invalid LECTERN_AI_TIMEOUT_SECS: {}", secs))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if let Some(rpm) = var("LECTERN_AI_REQUESTS_PER_MINUTE") {
            let rpm: u32 = rpm.parse().map_err(|_| {
                InterpretError::Config(format!("Invalid LECTERN_AI_REQUESTS_PER_MINUTE: {}", rpm))
            })?;
            builder = builder.requests_per_minute(rpm);
        }

        builder.build().map(Some)
    }
}

/// Builder for AiConfig
#[derive(Debug)]
pub struct AiConfigBuilder {
    config: AiConfig,
}

impl AiConfigBuilder {
    /// Create a new builder with default request settings
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            config: AiConfig {
                base_url: base_url.into(),
                model: model.into(),
                api_key: None,
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
                temperature: DEFAULT_TEMPERATURE,
                max_tokens: DEFAULT_MAX_TOKENS,
                requests_per_minute: None,
            },
        }
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the completion token budget
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Limit AI calls per minute. Zero removes the limit.
    pub fn requests_per_minute(mut self, requests: u32) -> Self {
        self.config.requests_per_minute = NonZeroU32::new(requests);
        self
    }

    /// Build the configuration, checking the base URL and model
    pub fn build(self) -> Result<AiConfig, InterpretError> {
        let config = self.config;

        let url = Url::parse(&config.base_url)
            .map_err(|e| InterpretError::Config(format!("Invalid base URL '{}': {}", config.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(InterpretError::Config(format!(
                "Unsupported URL scheme: {}",
                url.scheme()
            )));
        }
        if config.model.trim().is_empty() {
            return Err(InterpretError::Config("A model name is required".to_string()));
        }
        if config.timeout.is_zero() {
            return Err(InterpretError::Config("Timeout must be positive".to_string()));
        }

        Ok(config)
    }
}

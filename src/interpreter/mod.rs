//! Query interpreter
//!
//! Turns a free-text prompt into [`SearchFilters`]. When an [`AiConfig`] is
//! supplied the prompt goes to an OpenAI-compatible chat completions endpoint
//! first; any failure there (transport, timeout, error status, exhausted local
//! quota or an unreadable reply) is logged and answered by the rule-based
//! [`fallback`] instead. Interpretation itself never fails.

pub mod ai;
pub mod config;
pub mod error;
pub mod fallback;
mod prompt;

pub use ai::AiClient;
pub use config::{AiConfig, AiConfigBuilder};
pub use error::InterpretError;

use crate::filters::SearchFilters;
use chrono::{Datelike, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of interpreting one prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretationResult {
    pub filters: SearchFilters,

    /// One sentence describing how the prompt was read
    pub explanation: String,

    /// Whether the rule-based path produced the filters
    pub used_fallback: bool,
}

/// Prompt interpreter with an optional AI provider
#[derive(Clone)]
pub struct Interpreter {
    client: Option<AiClient>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl Interpreter {
    /// Create an interpreter. `None` runs the rule-based path only.
    pub fn new(config: Option<AiConfig>) -> Result<Self, InterpretError> {
        let limiter = config
            .as_ref()
            .and_then(|c| c.requests_per_minute)
            .map(|rpm| Arc::new(RateLimiter::direct(Quota::per_minute(rpm))));

        let client = config.map(AiClient::new).transpose()?;

        Ok(Self { client, limiter })
    }

    /// An interpreter that never calls out
    pub fn rule_based() -> Self {
        Self {
            client: None,
            limiter: None,
        }
    }

    /// Create an interpreter configured from the environment
    pub fn from_env() -> Result<Self, InterpretError> {
        Self::new(AiConfig::from_env()?)
    }

    /// Whether an AI provider is configured
    pub fn has_ai(&self) -> bool {
        self.client.is_some()
    }

    /// Interpret `prompt` against the current calendar year
    pub async fn interpret(&self, prompt: &str) -> InterpretationResult {
        self.interpret_with_year(prompt, Utc::now().year()).await
    }

    /// Interpret `prompt`, resolving relative years against `current_year`
    #[instrument(skip(self), fields(ai = self.has_ai()))]
    pub async fn interpret_with_year(&self, prompt: &str, current_year: i32) -> InterpretationResult {
        let Some(client) = &self.client else {
            info!("No AI provider configured, using rule-based interpretation");
            return fallback_result(prompt, current_year);
        };

        match self.ask_ai(client, prompt, current_year).await {
            Ok(ai) => {
                debug!(explanation = %ai.explanation, "AI interpretation succeeded");
                InterpretationResult {
                    filters: ai.filters,
                    explanation: ai.explanation,
                    used_fallback: false,
                }
            }
            Err(e) => {
                warn!(error = %e, "AI interpretation failed, using rule-based interpretation");
                fallback_result(prompt, current_year)
            }
        }
    }

    async fn ask_ai(
        &self,
        client: &AiClient,
        prompt: &str,
        current_year: i32,
    ) -> Result<ai::AiInterpretation, InterpretError> {
        if let Some(limiter) = &self.limiter {
            limiter.check().map_err(|_| InterpretError::RateLimited)?;
        }

        client.interpret(prompt, current_year).await
    }
}

fn fallback_result(prompt: &str, current_year: i32) -> InterpretationResult {
    InterpretationResult {
        filters: fallback::interpret(prompt, current_year),
        explanation: fallback::FALLBACK_EXPLANATION.to_string(),
        used_fallback: true,
    }
}

//! Core types for LLM requests and responses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What an LLM call is for. Used for logging and call statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmTask {
    /// Score candidates against a free-text description.
    RelevanceScoring,
    /// Explain a finished recommendation list to the user.
    Explanation,
}

impl fmt::Display for LlmTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelevanceScoring => write!(f, "relevance_scoring"),
            Self::Explanation => write!(f, "explanation"),
        }
    }
}

/// A request to the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    /// System prompt (assistant role and output rules).
    pub system: String,
    /// User prompt (description, candidates, payload).
    pub user: String,
    /// What the call is for.
    pub task: LlmTask,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl LlmRequest {
    /// A relevance-scoring request. The answer is one CSV row per
    /// candidate, so the token budget is generous.
    #[must_use]
    pub fn scoring(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            task: LlmTask::RelevanceScoring,
            max_tokens: 4096,
            temperature: 0.3,
            timeout_ms: 20_000,
        }
    }

    /// A short free-text explanation request.
    #[must_use]
    pub fn explanation(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            task: LlmTask::Explanation,
            max_tokens: 300,
            temperature: 0.4,
            timeout_ms: 20_000,
        }
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum output tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// A response from the LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    /// The generated text.
    pub text: String,
    /// How many tokens were generated.
    pub tokens_generated: u32,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Which model was used.
    pub model: String,
}

/// Running totals of LLM traffic through one client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallStats {
    /// Calls made (one per `generate`, however many attempts).
    pub calls: u64,
    /// Calls that returned text.
    pub succeeded: u64,
    /// Calls that failed after all attempts.
    pub failed: u64,
    /// Extra attempts beyond the first.
    pub retries: u64,
    /// Sum of latencies of successful attempts, in milliseconds.
    pub total_latency_ms: u64,
}

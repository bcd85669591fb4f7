//! LLM Client — unified interface for Ollama and OpenAI-compatible backends.

use std::time::{Duration, Instant};

use meeple_core::config::LlmConfig;
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::types::{CallStats, LlmRequest, LlmResponse};

/// Provider backend for LLM inference.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// Ollama running locally.
    Ollama {
        /// Server root, e.g. `http://localhost:11434`.
        base_url: String,
    },
    /// OpenAI-compatible chat completions API.
    OpenAiCompatible {
        /// API root, e.g. `https://api.openai.com`.
        base_url: String,
        /// Bearer token.
        api_key: String,
    },
    /// No LLM available: all calls return an error, so every LLM-backed
    /// signal degrades to "no information".
    None,
}

/// The main LLM client that routes requests to the configured backend.
#[derive(Debug)]
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
    max_retries: u32,
    stats: Mutex<CallStats>,
}

impl LlmClient {
    /// Create a new LLM client.
    ///
    /// # Errors
    /// Returns [`LlmError::ConfigError`] if the HTTP client cannot be built.
    pub fn new(
        provider: LlmProvider,
        model: impl Into<String>,
        max_retries: u32,
    ) -> Result<Self, LlmError> {
        let http = Client::builder()
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;
        Ok(Self {
            provider,
            http,
            model: model.into(),
            max_retries,
            stats: Mutex::new(CallStats::default()),
        })
    }

    /// Create a client from the `[llm]` config section.
    ///
    /// `provider = "openai"` reads the key from the environment variable
    /// named by `api_key_env`; a missing key is a configuration error.
    ///
    /// # Errors
    /// Returns [`LlmError::ConfigError`] for an unknown provider or a
    /// missing API key.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let provider = match config.provider.to_ascii_lowercase().as_str() {
            "none" => LlmProvider::None,
            "ollama" => LlmProvider::Ollama { base_url },
            "openai" => {
                let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                    LlmError::ConfigError(format!(
                        "environment variable {} is not set",
                        config.api_key_env
                    ))
                })?;
                LlmProvider::OpenAiCompatible { base_url, api_key }
            }
            other => {
                return Err(LlmError::ConfigError(format!("unknown LLM provider '{other}'")));
            }
        };
        Self::new(provider, config.model.clone(), config.max_retries)
    }

    /// Create a client with no LLM backend (all calls fail).
    #[must_use]
    pub fn none() -> Self {
        Self {
            provider: LlmProvider::None,
            http: Client::new(),
            model: String::new(),
            max_retries: 0,
            stats: Mutex::new(CallStats::default()),
        }
    }

    /// Generate a response from the LLM.
    ///
    /// # Errors
    /// Returns `Err` if the LLM is unavailable or all retries fail; callers
    /// fall back to their no-LLM behaviour.
    pub async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let result = match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("No LLM provider configured".into())),
            LlmProvider::Ollama { base_url } => self.generate_ollama(base_url, request).await,
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                self.generate_openai(base_url, api_key, request).await
            }
        };

        let mut stats = self.stats.lock();
        stats.calls += 1;
        match &result {
            Ok(resp) => {
                stats.succeeded += 1;
                stats.total_latency_ms += resp.latency_ms;
            }
            Err(_) => stats.failed += 1,
        }
        result
    }

    /// Generate using Ollama's API.
    async fn generate_ollama(
        &self,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let url = format!("{base_url}/api/generate");
        let body = json!({
            "model": self.model,
            "prompt": format!("{}\n\n{}", request.system, request.user),
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            }
        });

        let (json, latency_ms) = self.post_with_retries(&url, None, &body, request).await?;
        let text = json["response"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("Ollama response has no 'response' field".into()))?
            .trim()
            .to_string();

        Ok(LlmResponse {
            text,
            tokens_generated: token_count(&json["eval_count"]),
            latency_ms,
            model: self.model.clone(),
        })
    }

    /// Generate using an OpenAI-compatible API.
    async fn generate_openai(
        &self,
        base_url: &str,
        api_key: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let url = format!("{base_url}/v1/chat/completions");
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let (json, latency_ms) = self.post_with_retries(&url, Some(api_key), &body, request).await?;
        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("completion has no message content".into()))?
            .trim()
            .to_string();

        Ok(LlmResponse {
            text,
            tokens_generated: token_count(&json["usage"]["completion_tokens"]),
            latency_ms,
            model: self.model.clone(),
        })
    }

    /// POST `body`, retrying transport failures and non-2xx answers.
    ///
    /// A final attempt that timed out is reported as [`LlmError::Timeout`];
    /// any other final failure as [`LlmError::RetriesExhausted`].
    async fn post_with_retries(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &Value,
        request: &LlmRequest,
    ) -> Result<(Value, u64), LlmError> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                self.stats.lock().retries += 1;
                debug!(
                    task = %request.task,
                    "Retrying LLM call (attempt {}/{})",
                    attempt + 1,
                    self.max_retries + 1
                );
            }

            let start = Instant::now();
            let mut builder = self
                .http
                .post(url)
                .json(body)
                .timeout(Duration::from_millis(request.timeout_ms));
            if let Some(key) = bearer {
                builder = builder.bearer_auth(key);
            }

            let err = match builder.send().await {
                Ok(resp) if resp.status().is_success() => {
                    let json: Value = resp
                        .json()
                        .await
                        .map_err(|e| LlmError::ParseError(e.to_string()))?;
                    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    debug!(task = %request.task, latency_ms, "LLM call succeeded");
                    return Ok((json, latency_ms));
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    LlmError::RequestFailed(format!("HTTP {status}: {text}"))
                }
                Err(e) => match LlmError::from(e) {
                    LlmError::Timeout(_) => LlmError::Timeout(request.timeout_ms),
                    other => other,
                },
            };
            warn!(task = %request.task, error = %err, "LLM call failed");
            last_error = Some(err);
        }

        match last_error {
            Some(LlmError::Timeout(ms)) => Err(LlmError::Timeout(ms)),
            last => Err(LlmError::RetriesExhausted {
                attempts: self.max_retries + 1,
                last_error: last.map(|e| e.to_string()).unwrap_or_default(),
            }),
        }
    }

    /// Check if the LLM client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// Model name sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Snapshot of the call statistics.
    #[must_use]
    pub fn stats(&self) -> CallStats {
        *self.stats.lock()
    }
}

fn token_count(value: &Value) -> u32 {
    value.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(0)
}

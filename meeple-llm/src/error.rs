//! LLM error types.

use meeple_core::OracleError;
use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    /// LLM response body could not be interpreted.
    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("LLM request timed out after {0}ms")]
    Timeout(u64),

    /// LLM provider is unavailable.
    #[error("LLM provider unavailable: {0}")]
    Unavailable(String),

    /// All retry attempts exhausted.
    #[error("All LLM retry attempts exhausted after {attempts} tries: {last_error}")]
    RetriesExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error of the final attempt.
        last_error: String,
    },

    /// Configuration error.
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

/// Transport errors. A timeout carries `0` here because the request's budget
/// is not known; the client replaces it with the configured timeout.
impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(0)
        } else if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}

impl From<LlmError> for OracleError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(ms) => OracleError::Timeout(ms),
            LlmError::Unavailable(msg) | LlmError::ConfigError(msg) => {
                OracleError::Unavailable(msg)
            }
            LlmError::ParseError(msg) => OracleError::Malformed(msg),
            e @ (LlmError::RequestFailed(_) | LlmError::RetriesExhausted { .. }) => {
                OracleError::Request(e.to_string())
            }
        }
    }
}

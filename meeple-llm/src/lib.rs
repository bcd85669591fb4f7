//! # meeple-llm — LLM adapter for meeple
//!
//! Provides a unified interface for LLM inference across backends:
//!   - **Ollama** (local)
//!   - **OpenAI-compatible API** (OpenAI itself, or any server speaking
//!     `/v1/chat/completions`)
//!
//! Two things in meeple talk to a model, and both go through this crate:
//!   - [`LlmRelevanceOracle`] scores candidate games against a free-text
//!     description and plugs into the core engine as a
//!     [`meeple_core::RelevanceOracle`].
//!   - [`Explainer`] writes a short friendly paragraph about a finished
//!     ranking.
//!
//! Neither is allowed to fail a request. A missing, slow or confused model
//! degrades to "no relevance signal" and "no explanation".
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use meeple_core::config::LlmConfig;
//! use meeple_llm::{LlmClient, LlmRelevanceOracle};
//!
//! let config = LlmConfig::default();
//! let client = Arc::new(LlmClient::from_config(&config)?);
//! let oracle = LlmRelevanceOracle::new(client, &config);
//! # Ok::<(), meeple_llm::LlmError>(())
//! ```

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod explain;
pub mod prompt;
pub mod relevance;
pub mod types;

pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use explain::Explainer;
pub use relevance::LlmRelevanceOracle;
pub use types::{CallStats, LlmRequest, LlmResponse, LlmTask};

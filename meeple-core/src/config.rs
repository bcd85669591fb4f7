//! Configuration for the meeple recommender.
//!
//! Maps directly to `meeple.toml`. Every field has a default, so an empty
//! file (or no file at all) yields the tuned production values.

use serde::{Deserialize, Serialize};

use crate::error::{MeepleError, Result};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeepleConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Collaborative-filtering fold-in.
    #[serde(default)]
    pub cf: CfConfig,
    /// Content-based feature space.
    #[serde(default)]
    pub cbf: CbfConfig,
    /// Text relevance scorer.
    #[serde(default)]
    pub relevance: RelevanceConfig,
    /// Ensemble blending and selection.
    #[serde(default)]
    pub ensemble: EnsembleConfig,
    /// LLM integration settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

impl MeepleConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `MeepleError::Config` if the TOML is invalid or fails
    /// [`MeepleConfig::validate`].
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| MeepleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Reject values that would make the scoring path ill-defined.
    ///
    /// # Errors
    /// Returns `MeepleError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let level = self.general.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(MeepleError::Config(format!(
                "general.log_level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.general.log_level
            )));
        }
        if self.cf.regularization.is_nan() || self.cf.regularization <= 0.0 {
            return Err(MeepleError::Config("cf.regularization must be > 0".into()));
        }
        if self.cf.confidence_alpha.is_nan() || self.cf.confidence_alpha < 0.0 {
            return Err(MeepleError::Config("cf.confidence_alpha must be >= 0".into()));
        }
        let w = &self.cbf.weights;
        for (name, value) in [
            ("cbf.weights.categories", w.categories),
            ("cbf.weights.mechanics", w.mechanics),
            ("cbf.weights.types", w.types),
            ("cbf.weights.numeric", w.numeric),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MeepleError::Config(format!("{name} must be a finite value >= 0")));
            }
        }
        if self.relevance.max_candidates == 0 {
            return Err(MeepleError::Config("relevance.max_candidates must be > 0".into()));
        }
        if self.relevance.timeout_ms == 0 {
            return Err(MeepleError::Config("relevance.timeout_ms must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.ensemble.score_epsilon) {
            return Err(MeepleError::Config("ensemble.score_epsilon must be in [0, 1)".into()));
        }
        if self.ensemble.default_top_n == 0 {
            return Err(MeepleError::Config("ensemble.default_top_n must be > 0".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Accepted values of `general.log_level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default tracing level for hosts that install a subscriber: trace,
    /// debug, info, warn, error. `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Implicit-feedback fold-in parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfConfig {
    /// Confidence multiplier: each like gets confidence `1 + confidence_alpha`.
    #[serde(default = "default_5_0")]
    pub confidence_alpha: f32,
    /// Ridge regularizer λ added to the normal equations.
    #[serde(default = "default_0_3")]
    pub regularization: f32,
}

impl Default for CfConfig {
    fn default() -> Self {
        Self {
            confidence_alpha: 5.0,
            regularization: 0.3,
        }
    }
}

/// Content-based feature space.
///
/// The same values are used to build the item feature matrix and to encode
/// every query; changing them requires rebuilding the matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CbfConfig {
    /// Per-block column weights.
    #[serde(default)]
    pub weights: FeatureWeights,
    /// Neutral complexity weight used when the query has none.
    #[serde(default = "default_2_5")]
    pub default_weight: f32,
    /// Neutral player count used when the query has none.
    #[serde(default = "default_3_0")]
    pub default_players: f32,
    /// Neutral play time (minutes) used when the query has none.
    #[serde(default = "default_90_0")]
    pub default_play_time: f32,
}

impl Default for CbfConfig {
    fn default() -> Self {
        Self {
            weights: FeatureWeights::default(),
            default_weight: 2.5,
            default_players: 3.0,
            default_play_time: 90.0,
        }
    }
}

/// Column-block weights of the feature matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeights {
    /// One-hot category columns.
    #[serde(default = "default_1_5")]
    pub categories: f32,
    /// One-hot mechanic columns.
    #[serde(default = "default_2_0")]
    pub mechanics: f32,
    /// One-hot type columns.
    #[serde(default = "default_1_0")]
    pub types: f32,
    /// Min-max scaled numeric columns.
    #[serde(default = "default_0_5")]
    pub numeric: f32,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            categories: 1.5,
            mechanics: 2.0,
            types: 1.0,
            numeric: 0.5,
        }
    }
}

/// Text relevance scorer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceConfig {
    /// Maximum number of candidates sent to the oracle (highest rated first).
    #[serde(default = "default_200")]
    pub max_candidates: usize,
    /// Hard timeout for one oracle call in milliseconds.
    #[serde(default = "default_20000")]
    pub timeout_ms: u64,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            max_candidates: 200,
            timeout_ms: 20_000,
        }
    }
}

/// Ensemble selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Items with a combined score below this never enter the ranking.
    #[serde(default = "default_0_01")]
    pub score_epsilon: f32,
    /// Result size used when a request does not specify one.
    #[serde(default = "default_5_usize")]
    pub default_top_n: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            score_epsilon: 0.01,
            default_top_n: 5,
        }
    }
}

/// LLM integration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "openai", "ollama", "none".
    #[serde(default = "default_openai")]
    pub provider: String,
    /// Base URL for the LLM API.
    #[serde(default = "default_openai_url")]
    pub base_url: String,
    /// Model used for relevance scoring and explanations.
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Hard timeout for any LLM HTTP call in milliseconds.
    #[serde(default = "default_20000")]
    pub request_timeout_ms: u64,
    /// Max retries before giving up on a call.
    #[serde(default = "default_1")]
    pub max_retries: u32,
    /// Sampling temperature for relevance scoring.
    #[serde(default = "default_0_3")]
    pub scoring_temperature: f32,
    /// Sampling temperature for recommendation explanations.
    #[serde(default = "default_0_4")]
    pub explain_temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_ms: 20_000,
            max_retries: 1,
            scoring_temperature: 0.3,
            explain_temperature: 0.4,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_log_level() -> String { "info".to_string() }
fn default_openai() -> String { "openai".to_string() }
fn default_openai_url() -> String { "https://api.openai.com".to_string() }
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_0_01() -> f32 { 0.01 }
fn default_0_3() -> f32 { 0.3 }
fn default_0_4() -> f32 { 0.4 }
fn default_0_5() -> f32 { 0.5 }
fn default_1_0() -> f32 { 1.0 }
fn default_1_5() -> f32 { 1.5 }
fn default_2_0() -> f32 { 2.0 }
fn default_2_5() -> f32 { 2.5 }
fn default_3_0() -> f32 { 3.0 }
fn default_5_0() -> f32 { 5.0 }
fn default_90_0() -> f32 { 90.0 }
fn default_1() -> u32 { 1 }
fn default_5_usize() -> usize { 5 }
fn default_200() -> usize { 200 }
fn default_20000() -> u64 { 20_000 }

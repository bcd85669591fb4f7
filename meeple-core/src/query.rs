//! Recommendation requests and blend presets.

use serde::{Deserialize, Serialize};

use crate::error::{MeepleError, Result};
use crate::filter::AttributeFilters;
use crate::types::ItemId;

/// Named (α, β) blends offered to users.
///
/// α splits the structured share between CF (α) and CBF (1 − α); β is the
/// share given to text relevance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendPreset {
    /// Balanced: α 0.50, β 0.33.
    #[default]
    A,
    /// Collaborative leaning: α 0.67, β 0.25.
    B,
    /// Content leaning: α 0.33, β 0.25.
    C,
    /// Description heavy: α 0.50, β 0.50.
    D,
}

impl BlendPreset {
    /// All presets, in display order.
    pub const ALL: [BlendPreset; 4] = [Self::A, Self::B, Self::C, Self::D];

    /// CF share of the structured blend.
    #[must_use]
    pub fn alpha(self) -> f32 {
        match self {
            Self::A | Self::D => 0.50,
            Self::B => 0.67,
            Self::C => 0.33,
        }
    }

    /// Relevance share of the final blend.
    #[must_use]
    pub fn beta(self) -> f32 {
        match self {
            Self::A => 0.33,
            Self::B | Self::C => 0.25,
            Self::D => 0.50,
        }
    }
}

/// One recommendation request.
///
/// Deserializes from a partial document; omitted fields take their
/// defaults (no preferences, preset A blend, configured result size).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecommendationRequest {
    /// Items the user likes; drive CF and are never recommended back.
    pub liked: Vec<ItemId>,
    /// Items the user dislikes; never recommended.
    pub disliked: Vec<ItemId>,
    /// Items to leave out of the result (already owned, already played, ...).
    pub excluded: Vec<ItemId>,
    /// Attribute preferences; also hard filters on the result.
    pub filters: AttributeFilters,
    /// Free text describing what the user is looking for.
    pub description: String,
    /// CF share of the structured blend, in \[0, 1\].
    pub alpha: f32,
    /// Relevance share of the final blend, in \[0, 1\].
    pub beta: f32,
    /// Result size; `None` uses `ensemble.default_top_n`.
    pub top_n: Option<usize>,
}

impl Default for RecommendationRequest {
    fn default() -> Self {
        let preset = BlendPreset::default();
        Self {
            liked: Vec::new(),
            disliked: Vec::new(),
            excluded: Vec::new(),
            filters: AttributeFilters::default(),
            description: String::new(),
            alpha: preset.alpha(),
            beta: preset.beta(),
            top_n: None,
        }
    }
}

impl RecommendationRequest {
    /// Parse a request from JSON.
    ///
    /// # Errors
    /// Returns [`MeepleError::Serialization`] on malformed JSON or unknown
    /// fields.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MeepleError::Serialization(e.to_string()))
    }

    /// Use the blend of `preset`.
    #[must_use]
    pub fn with_preset(mut self, preset: BlendPreset) -> Self {
        self.alpha = preset.alpha();
        self.beta = preset.beta();
        self
    }

    /// Result size, falling back to `default_top_n`.
    #[must_use]
    pub fn top_n_or(&self, default_top_n: usize) -> usize {
        self.top_n.unwrap_or(default_top_n)
    }

    /// Reject blend weights outside \[0, 1\], a zero result size and
    /// malformed filters.
    ///
    /// # Errors
    /// Returns [`MeepleError::InvalidInput`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MeepleError::InvalidInput(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.top_n == Some(0) {
            return Err(MeepleError::InvalidInput("top_n must be > 0".into()));
        }
        self.filters.validate()
    }
}

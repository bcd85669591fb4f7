//! Adaptive blend weights and per-item score composition.
//!
//! ```text
//! combined = (α·CF + (1−α)·CBF)·(1−β) + β·Rel
//! ```
//!
//! Before blending, signals that carry no information (all zeros) hand
//! their share to the signals that do:
//!
//!   1. CF and CBF both empty  → β = 1
//!   2. Relevance empty        → β = 0
//!   3. Only CBF empty         → α = 1
//!      Only CF empty          → α = 0
//!
//! Rules apply in that order, so with every signal empty the result is
//! all zeros.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::round4;

/// Effective (α, β) after degeneracy re-routing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    /// CF share of the structured blend.
    pub alpha: f32,
    /// Relevance share of the final blend.
    pub beta: f32,
}

/// Which of the three signals are degenerate for this request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Degeneracy {
    /// CF vector is all zeros.
    pub cf: bool,
    /// CBF vector is all zeros.
    pub cbf: bool,
    /// Relevance vector is all zeros.
    pub relevance: bool,
}

impl Degeneracy {
    /// Whether no signal carries information.
    #[must_use]
    pub fn all(self) -> bool {
        self.cf && self.cbf && self.relevance
    }
}

/// Apply the re-routing rules to the requested weights.
#[must_use]
pub fn reweight(requested: BlendWeights, degenerate: Degeneracy) -> BlendWeights {
    let BlendWeights { mut alpha, mut beta } = requested;

    if degenerate.cf && degenerate.cbf {
        beta = 1.0;
    }
    if degenerate.relevance {
        beta = 0.0;
    }
    match (degenerate.cf, degenerate.cbf) {
        (false, true) => alpha = 1.0,
        (true, false) => alpha = 0.0,
        _ => {}
    }

    let effective = BlendWeights { alpha, beta };
    if effective != requested {
        debug!(
            requested_alpha = requested.alpha,
            requested_beta = requested.beta,
            alpha,
            beta,
            ?degenerate,
            "blend weights re-routed around degenerate signals"
        );
    }
    effective
}

/// One item's contribution from each signal. The parts sum to the
/// combined score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// `α·CF·(1−β)`
    pub cf: f32,
    /// `(1−α)·CBF·(1−β)`
    pub cbf: f32,
    /// `β·Rel`
    pub relevance: f32,
}

impl ScoreBreakdown {
    /// Sum of the parts.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.cf + self.cbf + self.relevance
    }

    /// The same breakdown at result precision.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self {
            cf: round4(self.cf),
            cbf: round4(self.cbf),
            relevance: round4(self.relevance),
        }
    }
}

/// Raw, unweighted signal values for one item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    /// Normalized CF score.
    pub cf: f32,
    /// Normalized CBF score.
    pub cbf: f32,
    /// Relevance score.
    pub relevance: f32,
}

/// Weight one item's signals.
#[must_use]
pub fn compute_breakdown(signals: SignalScores, weights: BlendWeights) -> ScoreBreakdown {
    let structured = 1.0 - weights.beta;
    ScoreBreakdown {
        cf: weights.alpha * signals.cf * structured,
        cbf: (1.0 - weights.alpha) * signals.cbf * structured,
        relevance: weights.beta * signals.relevance,
    }
}

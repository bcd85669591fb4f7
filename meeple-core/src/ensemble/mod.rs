//! Ensemble & filter engine: the ranking pipeline.
//!
//! For one request the engine
//!
//!   1. computes the CF, CBF and relevance signals (index-aligned vectors),
//!   2. re-routes blend weight away from degenerate signals,
//!   3. blends them into one combined score per item,
//!   4. zeroes liked, disliked and excluded items,
//!   5. zeroes items failing any attribute filter,
//!   6. keeps scores ≥ ε, sorts descending (stable) and truncates to N.
//!
//! See [`blend`] for the weighting rules.

pub mod blend;

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cbf::CbfScorer;
use crate::cf::CfScorer;
use crate::context::RecommenderContext;
use crate::error::Result;
use crate::query::RecommendationRequest;
use crate::relevance::{RelevanceOracle, RelevanceScorer};
use crate::types::{self, Item, ItemId, ScoreVector};

pub use blend::{BlendWeights, Degeneracy, ScoreBreakdown, SignalScores};

/// One ranked row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Catalog id.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Combined score, rounded to four decimals.
    pub score: f32,
    /// Weighted contribution of each signal, rounded to four decimals.
    pub components: ScoreBreakdown,
    /// Unweighted signal values.
    pub signals: SignalScores,
    /// Stored attributes of the item.
    pub item: Item,
}

/// Outcome of a recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendations {
    /// At most N rows, best first.
    Ranked(Vec<Recommendation>),
    /// Nothing cleared the score threshold.
    Empty,
}

impl Recommendations {
    /// Whether there is nothing to show.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Ranked(rows) => rows.is_empty(),
            Self::Empty => true,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    /// Ranked rows (empty slice for [`Recommendations::Empty`]).
    #[must_use]
    pub fn rows(&self) -> &[Recommendation] {
        match self {
            Self::Ranked(rows) => rows,
            Self::Empty => &[],
        }
    }

    /// Ids in rank order.
    #[must_use]
    pub fn ids(&self) -> Vec<ItemId> {
        self.rows().iter().map(|r| r.id).collect()
    }
}

/// The three raw signal vectors for one request, before blending.
#[derive(Debug, Clone)]
pub struct Signals {
    /// Collaborative-filtering scores.
    pub cf: ScoreVector,
    /// Content-based scores.
    pub cbf: ScoreVector,
    /// Text relevance scores.
    pub relevance: ScoreVector,
}

impl Signals {
    /// Which signals carry no information.
    #[must_use]
    pub fn degeneracy(&self) -> Degeneracy {
        Degeneracy {
            cf: types::is_degenerate(&self.cf),
            cbf: types::is_degenerate(&self.cbf),
            relevance: types::is_degenerate(&self.relevance),
        }
    }

    fn at(&self, idx: usize) -> SignalScores {
        SignalScores {
            cf: self.cf[idx],
            cbf: self.cbf[idx],
            relevance: self.relevance[idx],
        }
    }
}

/// Runs the scoring pipeline against a shared [`RecommenderContext`].
///
/// Cheap to clone and safe to share across tasks; every request works on
/// its own score vectors.
#[derive(Clone)]
pub struct EnsembleEngine {
    context: RecommenderContext,
    oracle: Arc<dyn RelevanceOracle>,
    cf: CfScorer,
    cbf: CbfScorer,
    relevance: RelevanceScorer,
}

impl std::fmt::Debug for EnsembleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleEngine")
            .field("items", &self.context.catalog().len())
            .finish_non_exhaustive()
    }
}

impl EnsembleEngine {
    /// Create an engine scoring relevance with `oracle`.
    #[must_use]
    pub fn new(context: RecommenderContext, oracle: Arc<dyn RelevanceOracle>) -> Self {
        let config = context.config();
        let cf = CfScorer::new(&config.cf);
        let cbf = CbfScorer::new(&config.cbf);
        let relevance = RelevanceScorer::new(&config.relevance);
        Self {
            context,
            oracle,
            cf,
            cbf,
            relevance,
        }
    }

    /// The shared tables.
    #[must_use]
    pub fn context(&self) -> &RecommenderContext {
        &self.context
    }

    /// Compute the three signals for `request`.
    ///
    /// A request without usable likes has a zero CF signal; the relevance
    /// signal is zero whenever the oracle has nothing to say.
    pub async fn signals(&self, request: &RecommendationRequest) -> Signals {
        let catalog = self.context.catalog();
        let n = catalog.len();

        let liked = catalog.indices_of(&request.liked);
        let cf = if liked.is_empty() {
            debug!("no liked items in catalog, cf signal skipped");
            vec![0.0; n]
        } else {
            self.cf
                .score(self.context.embeddings(), &liked)
                .unwrap_or_else(|e| {
                    debug!(error = %e, "cf signal unavailable");
                    vec![0.0; n]
                })
        };

        let cbf = self.cbf.score(self.context.features(), &request.filters);

        let predicate = request.filters.predicate();
        let relevance = self
            .relevance
            .score(self.oracle.as_ref(), catalog, &predicate, &request.description)
            .await;

        Signals { cf, cbf, relevance }
    }

    /// Rank the catalog for `request`.
    ///
    /// # Errors
    /// Returns [`crate::MeepleError::InvalidInput`] if the request fails
    /// [`RecommendationRequest::validate`]. Signal failures are not errors.
    pub async fn recommend(&self, request: &RecommendationRequest) -> Result<Recommendations> {
        request.validate()?;
        let signals = self.signals(request).await;
        Ok(self.rank(request, &signals))
    }

    /// Blend, exclude, filter and select, given precomputed signals.
    ///
    /// Items past the end of a short signal vector are not ranked.
    #[must_use]
    pub fn rank(&self, request: &RecommendationRequest, signals: &Signals) -> Recommendations {
        let catalog = self.context.catalog();
        let ensemble = &self.context.config().ensemble;
        let top_n = request.top_n_or(ensemble.default_top_n);

        let degenerate = signals.degeneracy();
        let weights = blend::reweight(
            BlendWeights {
                alpha: request.alpha,
                beta: request.beta,
            },
            degenerate,
        );

        let excluded: HashSet<usize> = catalog
            .indices_of(&request.liked)
            .into_iter()
            .chain(catalog.indices_of(&request.disliked))
            .chain(catalog.indices_of(&request.excluded))
            .collect();
        let predicate = request.filters.predicate();
        let n = catalog
            .len()
            .min(signals.cf.len())
            .min(signals.cbf.len())
            .min(signals.relevance.len());

        let mut ranked: Vec<(usize, f32, ScoreBreakdown)> = (0..n)
            .filter_map(|idx| {
                let breakdown = blend::compute_breakdown(signals.at(idx), weights);
                let mut combined = breakdown.total();
                if excluded.contains(&idx) {
                    combined = 0.0;
                }
                if !catalog.get(idx).is_some_and(|item| predicate.matches(item)) {
                    combined = 0.0;
                }
                (combined >= ensemble.score_epsilon).then_some((idx, combined, breakdown))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(top_n);

        let rows: Vec<Recommendation> = ranked
            .into_iter()
            .filter_map(|(idx, combined, breakdown)| {
                let item = catalog.get(idx)?;
                Some(Recommendation {
                    id: item.id,
                    name: item.name.clone(),
                    score: types::round4(combined),
                    components: breakdown.rounded(),
                    signals: signals.at(idx),
                    item: item.clone(),
                })
            })
            .collect();

        info!(
            returned = rows.len(),
            top_n,
            alpha = weights.alpha,
            beta = weights.beta,
            excluded = excluded.len(),
            "recommendations ranked"
        );

        if rows.is_empty() {
            Recommendations::Empty
        } else {
            Recommendations::Ranked(rows)
        }
    }
}

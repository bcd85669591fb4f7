//! Text-grounded relevance scoring.
//!
//! A free-text description is scored against a bounded candidate pool by an
//! external [`RelevanceOracle`]. The oracle is the only collaborator in the
//! scoring path that may be slow or fail, so the scorer wraps every call in
//! a timeout and degrades to an all-zero vector instead of failing the
//! request; the ensemble then re-routes the blend weight away from it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::ItemCatalog;
use crate::config::RelevanceConfig;
use crate::filter::FilterPredicate;
use crate::types::{Item, ItemId, ScoreVector};

// ---------------------------------------------------------------------------
// Oracle contract
// ---------------------------------------------------------------------------

/// Failures reported by a relevance oracle. Never surfaced past the
/// [`RelevanceScorer`].
#[derive(Debug, Error)]
pub enum OracleError {
    /// No backend is configured or reachable.
    #[error("Relevance oracle unavailable: {0}")]
    Unavailable(String),

    /// The backend was reached but the request failed.
    #[error("Relevance request failed: {0}")]
    Request(String),

    /// The backend answered with something that could not be interpreted.
    #[error("Malformed relevance response: {0}")]
    Malformed(String),

    /// The call did not complete within the time bound.
    #[error("Relevance oracle timed out after {0}ms")]
    Timeout(u64),
}

/// One entry of the candidate pool as presented to an oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Catalog id.
    pub id: ItemId,
    /// Display name; oracles that work on text return scores keyed by it.
    pub name: String,
    /// Publication year.
    pub year: i32,
    /// Free-text description.
    pub description: String,
}

impl From<&Item> for Candidate {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            year: item.year_published,
            description: item.description.clone(),
        }
    }
}

/// An external scorer of description/candidate relevance.
///
/// Implementations return a score in \[0, 1\] for any subset of the
/// candidates; missing candidates count as zero.
#[async_trait]
pub trait RelevanceOracle: Send + Sync {
    /// Score `candidates` against `description`.
    ///
    /// # Errors
    /// Any [`OracleError`]; callers treat all of them as "no signal".
    async fn score(
        &self,
        description: &str,
        candidates: &[Candidate],
    ) -> Result<HashMap<ItemId, f32>, OracleError>;
}

/// Oracle used when no backend is configured. Always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOracle;

#[async_trait]
impl RelevanceOracle for NullOracle {
    async fn score(
        &self,
        _description: &str,
        _candidates: &[Candidate],
    ) -> Result<HashMap<ItemId, f32>, OracleError> {
        Err(OracleError::Unavailable("no relevance backend configured".into()))
    }
}

/// Oracle answering from a fixed table, regardless of the description.
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    scores: HashMap<ItemId, f32>,
}

impl StaticOracle {
    /// Create an oracle from a fixed id → score table.
    #[must_use]
    pub fn new(scores: HashMap<ItemId, f32>) -> Self {
        Self { scores }
    }
}

impl FromIterator<(ItemId, f32)> for StaticOracle {
    fn from_iter<T: IntoIterator<Item = (ItemId, f32)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[async_trait]
impl RelevanceOracle for StaticOracle {
    async fn score(
        &self,
        _description: &str,
        candidates: &[Candidate],
    ) -> Result<HashMap<ItemId, f32>, OracleError> {
        Ok(candidates
            .iter()
            .filter_map(|c| self.scores.get(&c.id).map(|&s| (c.id, s)))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Builds the candidate pool, calls the oracle under a timeout and scatters
/// the answer into a catalog-aligned [`ScoreVector`].
#[derive(Debug, Clone, Copy)]
pub struct RelevanceScorer {
    max_candidates: usize,
    timeout: Duration,
}

impl RelevanceScorer {
    /// Create a scorer from configuration.
    #[must_use]
    pub fn new(config: &RelevanceConfig) -> Self {
        Self {
            max_candidates: config.max_candidates,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Catalog indices of the candidate pool: items passing `predicate`,
    /// highest rated first (ties keep catalog order), capped.
    #[must_use]
    pub fn candidate_pool(&self, catalog: &ItemCatalog, predicate: &FilterPredicate) -> Vec<usize> {
        let items = catalog.items();
        let mut pool: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| predicate.matches(item))
            .map(|(idx, _)| idx)
            .collect();
        pool.sort_by(|&a, &b| items[b].avg_rating.total_cmp(&items[a].avg_rating));
        pool.truncate(self.max_candidates);
        pool
    }

    /// Relevance of every catalog item to `description`, in \[0, 1\].
    ///
    /// Items outside the pool score zero. An empty description, an empty
    /// pool, an oracle error or a timeout all yield the zero vector.
    pub async fn score(
        &self,
        oracle: &dyn RelevanceOracle,
        catalog: &ItemCatalog,
        predicate: &FilterPredicate,
        description: &str,
    ) -> ScoreVector {
        let mut scores = vec![0.0; catalog.len()];
        let description = description.trim();
        if description.is_empty() {
            debug!("no description, relevance signal skipped");
            return scores;
        }

        let pool = self.candidate_pool(catalog, predicate);
        if pool.is_empty() {
            debug!("empty candidate pool, relevance signal skipped");
            return scores;
        }

        let candidates: Vec<Candidate> = pool
            .iter()
            .filter_map(|&idx| catalog.get(idx).map(Candidate::from))
            .collect();

        let call = oracle.score(description, &candidates);
        let answer = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                warn!(error = %e, "relevance oracle failed, using zero signal");
                return scores;
            }
            Err(_) => {
                #[allow(clippy::cast_possible_truncation)]
                let e = OracleError::Timeout(self.timeout.as_millis() as u64);
                warn!(error = %e, "relevance oracle timed out, using zero signal");
                return scores;
            }
        };

        let slots: HashMap<ItemId, usize> = pool
            .iter()
            .filter_map(|&idx| catalog.get(idx).map(|item| (item.id, idx)))
            .collect();

        let mut accepted = 0usize;
        for (id, score) in answer {
            if !score.is_finite() {
                debug!(%id, "dropping non-finite relevance score");
                continue;
            }
            match slots.get(&id) {
                Some(&idx) => {
                    scores[idx] = score.clamp(0.0, 1.0);
                    accepted += 1;
                }
                None => debug!(%id, "ignoring relevance score for item outside the pool"),
            }
        }

        debug!(pool = pool.len(), accepted, "relevance scores computed");
        scores
    }
}

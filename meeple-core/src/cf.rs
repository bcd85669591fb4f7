//! Collaborative filtering — implicit-feedback fold-in.
//!
//! A user who is not part of the trained factorization is represented by
//! the latent vector `u` that best explains their likes under the weighted
//! ridge objective used to train `V`:
//!
//! ```text
//! (Vₗᵀ C Vₗ + λI) u = Vₗᵀ C 1
//! ```
//!
//! where `Vₗ` are the rows of the liked items and `C` is the diagonal
//! confidence matrix (`1 + α` for every like). Every item is then scored by
//! `V · u` and the result is min-max normalized to \[0, 1\].

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::config::CfConfig;
use crate::embedding::EmbeddingStore;
use crate::error::{MeepleError, Result};
use crate::types::{self, ScoreVector};

/// Implicit fold-in scorer over an [`EmbeddingStore`].
#[derive(Debug, Clone, Copy)]
pub struct CfScorer {
    confidence_alpha: f64,
    regularization: f64,
}

impl CfScorer {
    /// Create a scorer from configuration.
    #[must_use]
    pub fn new(config: &CfConfig) -> Self {
        Self {
            confidence_alpha: f64::from(config.confidence_alpha),
            regularization: f64::from(config.regularization),
        }
    }

    /// Solve for the latent user vector of a set of liked rows.
    ///
    /// # Errors
    /// Returns [`MeepleError::InvalidInput`] if `liked` is empty, an index
    /// is out of range, or the normal equations cannot be solved.
    pub fn fold_in(&self, store: &EmbeddingStore, liked: &[usize]) -> Result<DVector<f32>> {
        if liked.is_empty() {
            return Err(MeepleError::InvalidInput(
                "collaborative filtering needs at least one liked item".into(),
            ));
        }

        let v = store.matrix();
        let k = store.dimensions();
        let confidence = 1.0 + self.confidence_alpha;

        let mut a = DMatrix::<f64>::identity(k, k) * self.regularization;
        let mut b = DVector::<f64>::zeros(k);

        for &i in liked {
            if i >= v.nrows() {
                return Err(MeepleError::InvalidInput(format!(
                    "liked row {i} out of range for {} embeddings",
                    v.nrows()
                )));
            }
            let row: DVector<f64> = v.row(i).transpose().map(f64::from);
            // A += c · vᵢ vᵢᵀ ; b += c · vᵢ
            a.ger(confidence, &row, &row, 1.0);
            b.axpy(confidence, &row, 1.0);
        }

        let u = match a.clone().cholesky() {
            Some(chol) => chol.solve(&b),
            None => {
                debug!("fold-in system not positive definite, falling back to LU");
                a.lu().solve(&b).ok_or_else(|| {
                    MeepleError::InvalidInput("fold-in normal equations are singular".into())
                })?
            }
        };

        if u.iter().any(|x| !x.is_finite()) {
            return Err(MeepleError::InvalidInput(
                "fold-in produced a non-finite user vector".into(),
            ));
        }

        #[allow(clippy::cast_possible_truncation)]
        Ok(u.map(|x| x as f32))
    }

    /// Score every item for a user who liked the rows in `liked`.
    ///
    /// Output is index-aligned with the store and normalized to \[0, 1\];
    /// if all scores coincide (e.g. the liked rows are all zero) the
    /// vector is all zeros.
    ///
    /// # Errors
    /// Same as [`CfScorer::fold_in`].
    pub fn score(&self, store: &EmbeddingStore, liked: &[usize]) -> Result<ScoreVector> {
        let u = self.fold_in(store, liked)?;
        let raw = store.matrix() * u;
        let mut scores: ScoreVector = raw.iter().copied().collect();
        types::min_max_normalize(&mut scores);

        debug!(
            liked = liked.len(),
            degenerate = types::is_degenerate(&scores),
            "cf scores computed"
        );
        Ok(scores)
    }
}

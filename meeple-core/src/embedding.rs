//! Item embedding store — the precomputed latent factor matrix `V`.
//!
//! `V` is produced offline by an implicit-feedback matrix factorization and
//! loaded once per process. Row `i` is the latent vector of catalog item
//! `i`; the collaborative-filtering fold-in in [`crate::cf`] reads it but
//! never mutates it.

use std::path::Path;

use nalgebra::DMatrix;

use crate::error::{MeepleError, Result};

/// Dense N×K matrix of item latent vectors.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    matrix: DMatrix<f32>,
}

impl EmbeddingStore {
    /// Build a store from one row per item.
    ///
    /// # Errors
    /// Returns [`MeepleError::InvalidInput`] if there are no rows or the
    /// dimensionality is zero, and [`MeepleError::ShapeMismatch`] if the
    /// rows have differing lengths.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let first = rows
            .first()
            .ok_or_else(|| MeepleError::InvalidInput("embedding matrix has no rows".into()))?;
        let dims = first.len();
        if dims == 0 {
            return Err(MeepleError::InvalidInput(
                "embedding dimensionality must be positive".into(),
            ));
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != dims {
                return Err(MeepleError::ShapeMismatch {
                    what: format!("embedding row {i}"),
                    expected: dims,
                    actual: row.len(),
                });
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(MeepleError::InvalidInput(format!(
                    "embedding row {i} contains a non-finite value"
                )));
            }
        }

        let matrix = DMatrix::from_row_iterator(rows.len(), dims, rows.iter().flatten().copied());
        Ok(Self { matrix })
    }

    /// Wrap an existing matrix (rows = items, columns = latent factors).
    ///
    /// # Errors
    /// Returns [`MeepleError::InvalidInput`] for an empty matrix.
    pub fn from_matrix(matrix: DMatrix<f32>) -> Result<Self> {
        if matrix.nrows() == 0 || matrix.ncols() == 0 {
            return Err(MeepleError::InvalidInput("embedding matrix is empty".into()));
        }
        Ok(Self { matrix })
    }

    /// Parse a JSON array of rows (`[[f32; K]; N]`).
    ///
    /// # Errors
    /// Returns [`MeepleError::Serialization`] on malformed JSON, or any
    /// error from [`EmbeddingStore::from_rows`].
    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<Vec<f32>> =
            serde_json::from_str(json).map_err(|e| MeepleError::Serialization(e.to_string()))?;
        Self::from_rows(&rows)
    }

    /// Load a JSON embedding feed from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Number of items (rows).
    #[must_use]
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    /// Always false for a constructed store; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    /// Latent dimensionality K.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.matrix.ncols()
    }

    /// The full N×K matrix.
    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f32> {
        &self.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_kept_in_order() {
        let store = EmbeddingStore::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]])
            .expect("store");
        assert_eq!(store.len(), 3);
        assert_eq!(store.dimensions(), 2);
        assert!((store.matrix()[(1, 0)] - 3.0).abs() < f32::EPSILON);
        assert!((store.matrix()[(2, 1)] - 6.0).abs() < f32::EPSILON);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = EmbeddingStore::from_rows(&[vec![1.0, 2.0], vec![3.0]]).expect_err("ragged");
        assert!(matches!(err, MeepleError::ShapeMismatch { .. }));
    }

    #[test]
    fn empty_and_non_finite_are_rejected() {
        assert!(EmbeddingStore::from_rows(&[]).is_err());
        assert!(EmbeddingStore::from_rows(&[vec![]]).is_err());
        assert!(EmbeddingStore::from_rows(&[vec![f32::NAN, 1.0]]).is_err());
    }

    #[test]
    fn parses_json_rows() {
        let store = EmbeddingStore::from_json("[[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]").expect("store");
        assert_eq!(store.len(), 2);
        assert_eq!(store.dimensions(), 3);
    }
}

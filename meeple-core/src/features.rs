//! Feature encoder — the weighted content-based vector space.
//!
//! Every item becomes one row of
//!
//! ```text
//! [ categories one-hot × w_c | mechanics one-hot × w_m |
//!   types one-hot × w_t | scaled numeric × w_n ]
//! ```
//!
//! where the label vocabularies and the numeric min-max scaler are fitted
//! once on the catalog. Queries in [`crate::cbf`] are encoded with the very
//! same [`FeatureEncoder`], so item rows and query vectors always share one
//! space. The built matrix can be snapshotted to disk with `bincode` and
//! reloaded at process start instead of refitting.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::ItemCatalog;
use crate::config::FeatureWeights;
use crate::error::{MeepleError, Result};
use crate::types::{Item, LabelField};

/// Number of numeric feature columns (`weight`, `best_players`, `avg_play_time`).
pub const NUMERIC_FEATURES: usize = 3;

// ---------------------------------------------------------------------------
// LabelBinarizer
// ---------------------------------------------------------------------------

/// Multi-label one-hot encoder with a fixed, sorted vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelBinarizer {
    classes: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl LabelBinarizer {
    /// Fit the vocabulary to every label seen in `label_sets`.
    pub fn fit<'a, I>(label_sets: I) -> Self
    where
        I: IntoIterator<Item = &'a BTreeSet<String>>,
    {
        let vocab: BTreeSet<&String> = label_sets.into_iter().flatten().collect();
        Self::from_classes(vocab.into_iter().cloned().collect())
    }

    fn from_classes(classes: Vec<String>) -> Self {
        let index = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self { classes, index }
    }

    /// Vocabulary size.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the vocabulary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// The sorted vocabulary.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Write `weight` into `out[class]` for each known label. Returns the
    /// labels that are not in the vocabulary.
    fn encode_into<'a, I>(&self, labels: I, weight: f32, out: &mut [f32]) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut unseen = Vec::new();
        for label in labels {
            match self.index.get(label) {
                Some(&i) => out[i] = weight,
                None => unseen.push(label.as_str()),
            }
        }
        unseen
    }
}

// ---------------------------------------------------------------------------
// MinMaxScaler
// ---------------------------------------------------------------------------

/// Per-column min-max scaler over the numeric features.
///
/// A constant column keeps a unit scale, so it encodes as `x - min`
/// (zero for every catalog item).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: [f32; NUMERIC_FEATURES],
    scale: [f32; NUMERIC_FEATURES],
}

impl MinMaxScaler {
    /// Fit column minima and ranges. Non-finite inputs count as zero.
    pub fn fit<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = [f32; NUMERIC_FEATURES]>,
    {
        let mut lo = [f32::INFINITY; NUMERIC_FEATURES];
        let mut hi = [f32::NEG_INFINITY; NUMERIC_FEATURES];
        for row in rows {
            for (c, v) in sanitize(row).into_iter().enumerate() {
                lo[c] = lo[c].min(v);
                hi[c] = hi[c].max(v);
            }
        }

        let mut min = [0.0; NUMERIC_FEATURES];
        let mut scale = [1.0; NUMERIC_FEATURES];
        for c in 0..NUMERIC_FEATURES {
            if lo[c].is_finite() {
                min[c] = lo[c];
                let range = hi[c] - lo[c];
                if range > f32::EPSILON {
                    scale[c] = range;
                }
            }
        }
        Self { min, scale }
    }

    /// Scale one row.
    #[must_use]
    pub fn transform(&self, row: [f32; NUMERIC_FEATURES]) -> [f32; NUMERIC_FEATURES] {
        let row = sanitize(row);
        std::array::from_fn(|c| (row[c] - self.min[c]) / self.scale[c])
    }
}

fn sanitize(row: [f32; NUMERIC_FEATURES]) -> [f32; NUMERIC_FEATURES] {
    row.map(|v| if v.is_finite() { v } else { 0.0 })
}

// ---------------------------------------------------------------------------
// FeatureEncoder
// ---------------------------------------------------------------------------

/// Fitted encoders plus block weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    categories: LabelBinarizer,
    mechanics: LabelBinarizer,
    types: LabelBinarizer,
    scaler: MinMaxScaler,
    weights: FeatureWeights,
}

impl FeatureEncoder {
    /// Fit vocabularies and the numeric scaler on the catalog.
    #[must_use]
    pub fn fit(catalog: &ItemCatalog, weights: FeatureWeights) -> Self {
        let items = catalog.items();
        Self {
            categories: LabelBinarizer::fit(items.iter().map(|i| &i.categories)),
            mechanics: LabelBinarizer::fit(items.iter().map(|i| &i.mechanics)),
            types: LabelBinarizer::fit(items.iter().map(|i| &i.types)),
            scaler: MinMaxScaler::fit(items.iter().map(Item::numeric_features)),
            weights,
        }
    }

    /// Total feature dimensionality D.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.categories.len() + self.mechanics.len() + self.types.len() + NUMERIC_FEATURES
    }

    /// The block weights this encoder was built with.
    #[must_use]
    pub fn weights(&self) -> FeatureWeights {
        self.weights
    }

    /// Vocabulary of one label field.
    #[must_use]
    pub fn binarizer(&self, field: LabelField) -> &LabelBinarizer {
        match field {
            LabelField::Categories => &self.categories,
            LabelField::Mechanics => &self.mechanics,
            LabelField::Types => &self.types,
        }
    }

    fn block_weight(&self, field: LabelField) -> f32 {
        match field {
            LabelField::Categories => self.weights.categories,
            LabelField::Mechanics => self.weights.mechanics,
            LabelField::Types => self.weights.types,
        }
    }

    /// Encode an arbitrary label/numeric combination. Labels outside the
    /// vocabulary are skipped and returned as `(field, label)` pairs.
    pub fn encode<'a>(
        &self,
        labels: [&'a [String]; 3],
        numeric: [f32; NUMERIC_FEATURES],
    ) -> (Vec<f32>, Vec<(LabelField, &'a str)>) {
        let mut out = vec![0.0; self.dimensions()];
        let mut unseen = Vec::new();
        let mut offset = 0;

        for (field, field_labels) in LabelField::ALL.into_iter().zip(labels) {
            let binarizer = self.binarizer(field);
            let end = offset + binarizer.len();
            let weight = self.block_weight(field);
            let skipped = binarizer.encode_into(field_labels, weight, &mut out[offset..end]);
            unseen.extend(skipped.into_iter().map(|l| (field, l)));
            offset = end;
        }

        let scaled = self.scaler.transform(numeric);
        for (c, v) in scaled.into_iter().enumerate() {
            out[offset + c] = v * self.weights.numeric;
        }
        (out, unseen)
    }

    /// Encode a catalog item.
    #[must_use]
    pub fn encode_item(&self, item: &Item) -> Vec<f32> {
        let mut out = vec![0.0; self.dimensions()];
        let mut offset = 0;
        for field in LabelField::ALL {
            let binarizer = self.binarizer(field);
            let end = offset + binarizer.len();
            let weight = self.block_weight(field);
            binarizer.encode_into(item.labels(field), weight, &mut out[offset..end]);
            offset = end;
        }
        let scaled = self.scaler.transform(item.numeric_features());
        for (c, v) in scaled.into_iter().enumerate() {
            out[offset + c] = v * self.weights.numeric;
        }
        out
    }

    fn rebuild_indices(&mut self) {
        for b in [&mut self.categories, &mut self.mechanics, &mut self.types] {
            *b = LabelBinarizer::from_classes(std::mem::take(&mut b.classes));
        }
    }
}

// ---------------------------------------------------------------------------
// FeatureMatrix
// ---------------------------------------------------------------------------

/// The precomputed N×D weighted feature matrix with its encoder.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    encoder: FeatureEncoder,
    matrix: DMatrix<f32>,
    row_norms: Vec<f32>,
}

/// On-disk form of a [`FeatureMatrix`].
#[derive(Serialize, Deserialize)]
struct FeatureSnapshot {
    encoder: FeatureEncoder,
    rows: usize,
    cols: usize,
    /// Row-major values.
    data: Vec<f32>,
}

impl FeatureMatrix {
    /// Fit the encoder on `catalog` and encode every item.
    #[must_use]
    pub fn build(catalog: &ItemCatalog, weights: FeatureWeights) -> Self {
        let encoder = FeatureEncoder::fit(catalog, weights);
        let dims = encoder.dimensions();
        let matrix = DMatrix::from_row_iterator(
            catalog.len(),
            dims,
            catalog.items().iter().flat_map(|item| encoder.encode_item(item)),
        );
        info!(
            items = catalog.len(),
            dimensions = dims,
            categories = encoder.categories.len(),
            mechanics = encoder.mechanics.len(),
            types = encoder.types.len(),
            "feature matrix built"
        );
        Self::from_parts(encoder, matrix)
    }

    fn from_parts(encoder: FeatureEncoder, matrix: DMatrix<f32>) -> Self {
        let row_norms = matrix.row_iter().map(|r| r.norm()).collect();
        Self {
            encoder,
            matrix,
            row_norms,
        }
    }

    /// Number of item rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    /// Whether the matrix has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    /// Feature dimensionality D.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.matrix.ncols()
    }

    /// The encoder every query must go through.
    #[must_use]
    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// The N×D matrix.
    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f32> {
        &self.matrix
    }

    /// Precomputed L2 norm of each row.
    #[must_use]
    pub fn row_norms(&self) -> &[f32] {
        &self.row_norms
    }

    /// Index of the first row that is not this encoder's encoding of the
    /// catalog item at the same index, or `None` if every row matches.
    ///
    /// Catches a snapshot built from another catalog or another item order.
    #[must_use]
    pub fn first_mismatch(&self, catalog: &ItemCatalog) -> Option<usize> {
        if self.len() != catalog.len() {
            return Some(self.len().min(catalog.len()));
        }
        catalog.items().iter().enumerate().find_map(|(idx, item)| {
            let expected = self.encoder.encode_item(item);
            let row = self.matrix.row(idx);
            let same = expected.len() == row.len()
                && expected.iter().zip(row.iter()).all(|(a, b)| (a - b).abs() <= 1e-5);
            (!same).then_some(idx)
        })
    }

    /// Write a `bincode` snapshot.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = FeatureSnapshot {
            encoder: self.encoder.clone(),
            rows: self.matrix.nrows(),
            cols: self.matrix.ncols(),
            data: self.matrix.transpose().as_slice().to_vec(),
        };
        let bytes =
            bincode::serialize(&snapshot).map_err(|e| MeepleError::Serialization(e.to_string()))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a snapshot written by [`FeatureMatrix::save`].
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, does not decode, or
    /// its shape disagrees with its encoder.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mut snapshot: FeatureSnapshot =
            bincode::deserialize(&bytes).map_err(|e| MeepleError::Serialization(e.to_string()))?;
        snapshot.encoder.rebuild_indices();

        if snapshot.cols != snapshot.encoder.dimensions() {
            return Err(MeepleError::ShapeMismatch {
                what: "feature snapshot columns".into(),
                expected: snapshot.encoder.dimensions(),
                actual: snapshot.cols,
            });
        }
        if snapshot.data.len() != snapshot.rows * snapshot.cols {
            return Err(MeepleError::ShapeMismatch {
                what: "feature snapshot values".into(),
                expected: snapshot.rows * snapshot.cols,
                actual: snapshot.data.len(),
            });
        }

        let matrix = DMatrix::from_row_slice(snapshot.rows, snapshot.cols, &snapshot.data);
        Ok(Self::from_parts(snapshot.encoder, matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemId;

    fn item(id: u32, cats: &[&str], mechs: &[&str], weight: f32, players: f32, time: f32) -> Item {
        Item {
            id: ItemId(id),
            name: format!("Game {id}"),
            description: String::new(),
            categories: cats.iter().map(|s| (*s).to_string()).collect(),
            mechanics: mechs.iter().map(|s| (*s).to_string()).collect(),
            types: BTreeSet::new(),
            weight,
            players: (1, 4),
            best_players: players,
            play_time: (30, 90),
            avg_play_time: time,
            year_published: 2015,
            avg_rating: 7.0,
        }
    }

    fn catalog() -> ItemCatalog {
        ItemCatalog::new(vec![
            item(1, &["Fantasy"], &["Dice Rolling"], 1.0, 2.0, 30.0),
            item(2, &["Economic", "Fantasy"], &[], 3.0, 4.0, 120.0),
            item(3, &[], &["Worker Placement"], 5.0, 3.0, 60.0),
        ])
        .expect("catalog")
    }

    #[test]
    fn vocabulary_is_sorted_and_deduplicated() {
        let encoder = FeatureEncoder::fit(&catalog(), FeatureWeights::default());
        assert_eq!(
            encoder.binarizer(LabelField::Categories).classes(),
            &["Economic".to_string(), "Fantasy".to_string()]
        );
        assert_eq!(encoder.binarizer(LabelField::Types).len(), 0);
        // 2 categories + 2 mechanics + 0 types + 3 numeric
        assert_eq!(encoder.dimensions(), 7);
    }

    #[test]
    fn item_rows_carry_block_weights() {
        let matrix = FeatureMatrix::build(&catalog(), FeatureWeights::default());
        let row = matrix.matrix().row(1);
        assert!((row[0] - 1.5).abs() < 1e-6, "Economic × 1.5");
        assert!((row[1] - 1.5).abs() < 1e-6, "Fantasy × 1.5");
        assert!(row[2].abs() < 1e-6 && row[3].abs() < 1e-6, "no mechanics");
        // weight 3.0 in [1, 5] → 0.5, × 0.5
        assert!((row[4] - 0.25).abs() < 1e-6);
        // best players 4 in [2, 4] → 1.0, × 0.5
        assert!((row[5] - 0.5).abs() < 1e-6);
        // play time 120 in [30, 120] → 1.0, × 0.5
        assert!((row[6] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn unseen_query_labels_are_reported_not_encoded() {
        let encoder = FeatureEncoder::fit(&catalog(), FeatureWeights::default());
        let cats = vec!["Fantasy".to_string(), "Space".to_string()];
        let (vec, unseen) = encoder.encode([cats.as_slice(), &[], &[]], [3.0, 3.0, 75.0]);
        assert_eq!(vec.len(), encoder.dimensions());
        assert!((vec[1] - 1.5).abs() < 1e-6);
        assert_eq!(unseen, vec![(LabelField::Categories, "Space")]);
    }

    #[test]
    fn constant_numeric_column_scales_to_zero() {
        let scaler = MinMaxScaler::fit([[2.0, 1.0, 5.0], [2.0, 3.0, 5.0]]);
        let out = scaler.transform([2.0, 2.0, 5.0]);
        assert!(out[0].abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert!(out[2].abs() < 1e-6);
    }

    #[test]
    fn snapshot_round_trip_preserves_matrix_and_encoder() {
        let built = FeatureMatrix::build(&catalog(), FeatureWeights::default());
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("features.bin");
        built.save(&path).expect("save");

        let loaded = FeatureMatrix::load(&path).expect("load");
        assert_eq!(loaded.matrix(), built.matrix());
        assert_eq!(loaded.encoder(), built.encoder());

        // Reloaded encoder must still resolve labels.
        let cats = vec!["Economic".to_string()];
        let (v, unseen) = loaded.encoder().encode([cats.as_slice(), &[], &[]], [3.0, 3.0, 75.0]);
        assert!(unseen.is_empty());
        assert!((v[0] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("features.bin");
        std::fs::write(&path, b"not a snapshot").expect("write");
        assert!(FeatureMatrix::load(&path).is_err());
    }
}

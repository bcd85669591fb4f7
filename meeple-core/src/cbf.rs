//! Content-based filtering — cosine similarity in the weighted feature space.
//!
//! The request's attribute filters double as the content preference: the
//! selected labels become one-hot blocks and each numeric range contributes
//! its midpoint. Absent numeric preferences fall back to neutral values so
//! that an empty preference still yields a (midpoint-driven) ranking.

use nalgebra::DVector;
use tracing::debug;

use crate::config::CbfConfig;
use crate::features::FeatureMatrix;
use crate::filter::{AttributeFilters, NumericRange};
use crate::types::{self, LabelField, ScoreVector};

/// Content-based scorer.
#[derive(Debug, Clone, Copy)]
pub struct CbfScorer {
    default_weight: f32,
    default_players: f32,
    default_play_time: f32,
}

impl CbfScorer {
    /// Create a scorer from configuration.
    #[must_use]
    pub fn new(config: &CbfConfig) -> Self {
        Self {
            default_weight: config.default_weight,
            default_players: config.default_players,
            default_play_time: config.default_play_time,
        }
    }

    /// Encode the preference as a query vector in the feature space of
    /// `features`.
    #[must_use]
    pub fn query_vector(&self, features: &FeatureMatrix, prefs: &AttributeFilters) -> DVector<f32> {
        let centre =
            |range: Option<NumericRange>, default: f32| range.map_or(default, |r| r.midpoint());
        let numeric = [
            centre(prefs.weight, self.default_weight),
            centre(prefs.players, self.default_players),
            centre(prefs.play_time, self.default_play_time),
        ];

        let (query, unseen) = features.encoder().encode(
            [
                prefs.labels(LabelField::Categories),
                prefs.labels(LabelField::Mechanics),
                prefs.labels(LabelField::Types),
            ],
            numeric,
        );
        for (field, label) in unseen {
            debug!(%field, label, "ignoring label outside the feature vocabulary");
        }
        DVector::from_vec(query)
    }

    /// Score every item by cosine similarity to the preference, normalized
    /// to \[0, 1\]. A constant similarity collapses to all zeros.
    #[must_use]
    pub fn score(&self, features: &FeatureMatrix, prefs: &AttributeFilters) -> ScoreVector {
        let query = self.query_vector(features, prefs);
        let query_norm = query.norm();

        let mut scores: ScoreVector = if query_norm <= f32::EPSILON {
            vec![0.0; features.len()]
        } else {
            let dots = features.matrix() * &query;
            dots.iter()
                .zip(features.row_norms())
                .map(|(&dot, &row_norm)| {
                    if row_norm <= f32::EPSILON {
                        0.0
                    } else {
                        dot / (row_norm * query_norm)
                    }
                })
                .collect()
        };
        types::min_max_normalize(&mut scores);

        debug!(
            items = scores.len(),
            degenerate = types::is_degenerate(&scores),
            "cbf scores computed"
        );
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemCatalog;
    use crate::config::FeatureWeights;
    use crate::types::{Item, ItemId};
    use std::collections::BTreeSet;

    fn item(id: u32, cats: &[&str], mechs: &[&str], weight: f32, players: f32, time: f32) -> Item {
        Item {
            id: ItemId(id),
            name: format!("Game {id}"),
            description: String::new(),
            categories: cats.iter().map(|s| (*s).to_string()).collect(),
            mechanics: mechs.iter().map(|s| (*s).to_string()).collect(),
            types: BTreeSet::new(),
            weight,
            players: (1, 5),
            best_players: players,
            play_time: (30, 150),
            avg_play_time: time,
            year_published: 2018,
            avg_rating: 7.5,
        }
    }

    fn features_of(items: Vec<Item>) -> FeatureMatrix {
        let catalog = ItemCatalog::new(items).expect("catalog");
        FeatureMatrix::build(&catalog, FeatureWeights::default())
    }

    fn features() -> FeatureMatrix {
        features_of(vec![
            item(1, &["Fantasy"], &["Deck Building"], 2.0, 2.0, 45.0),
            item(2, &["Economic"], &["Worker Placement"], 3.5, 4.0, 120.0),
            item(3, &["Fantasy", "Adventure"], &["Dice Rolling"], 2.5, 3.0, 90.0),
            item(4, &["Party"], &[], 1.0, 5.0, 20.0),
        ])
    }

    fn scorer() -> CbfScorer {
        CbfScorer::new(&CbfConfig::default())
    }

    #[test]
    fn output_is_aligned_and_bounded() {
        let features = features();
        let scores = scorer().score(&features, &AttributeFilters::default());
        assert_eq!(scores.len(), features.len());
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn empty_preference_ranks_by_numeric_midpoints() {
        // Defaults (2.5 weight, 3 players, 90 min) are exactly item 3's numbers.
        let features = features_of(vec![
            item(1, &[], &[], 2.0, 2.0, 45.0),
            item(2, &[], &[], 3.5, 4.0, 120.0),
            item(3, &[], &[], 2.5, 3.0, 90.0),
            item(4, &[], &[], 1.0, 5.0, 20.0),
        ]);
        let scores = scorer().score(&features, &AttributeFilters::default());
        let best = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(best, Some(2));
    }

    #[test]
    fn matching_mechanic_wins() {
        let prefs = AttributeFilters {
            mechanics: vec!["Worker Placement".into()],
            ..Default::default()
        };
        let scores = scorer().score(&features(), &prefs);
        assert!((scores[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unseen_labels_are_ignored() {
        let with_unknown = AttributeFilters {
            categories: vec!["Fantasy".into(), "Underwater Basket Weaving".into()],
            ..Default::default()
        };
        let known_only = AttributeFilters {
            categories: vec!["Fantasy".into()],
            ..Default::default()
        };
        let features = features();
        assert_eq!(
            scorer().score(&features, &with_unknown),
            scorer().score(&features, &known_only)
        );
    }

    #[test]
    fn query_has_feature_dimensionality() {
        let features = features();
        let q = scorer().query_vector(&features, &AttributeFilters::default());
        assert_eq!(q.len(), features.dimensions());
    }
}

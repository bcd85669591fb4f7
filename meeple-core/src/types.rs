//! Core type definitions for the meeple recommender.
//!
//! All types are serializable so that item tables can be shipped as JSON
//! feeds and result rows can be handed straight to a presentation layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for an item (the `BoardGameGeek` id for board games).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ItemId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// The three multi-label attribute families of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelField {
    /// Thematic categories ("Fantasy", "Economic", ...).
    Categories,
    /// Game mechanics ("Deck Building", "Worker Placement", ...).
    Mechanics,
    /// Game types ("Strategy", "Family", ...).
    Types,
}

impl LabelField {
    /// All label fields in feature-matrix column order.
    pub const ALL: [LabelField; 3] = [Self::Categories, Self::Mechanics, Self::Types];
}

impl fmt::Display for LabelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Categories => "categories",
            Self::Mechanics => "mechanics",
            Self::Types => "types",
        };
        write!(f, "{name}")
    }
}

/// A recommendable item with its stored attributes.
///
/// Immutable once loaded into an [`ItemCatalog`](crate::catalog::ItemCatalog).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique id.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Free-text description (fed to the relevance oracle).
    #[serde(default)]
    pub description: String,
    /// Thematic categories.
    #[serde(default)]
    pub categories: BTreeSet<String>,
    /// Game mechanics.
    #[serde(default)]
    pub mechanics: BTreeSet<String>,
    /// Game types.
    #[serde(default)]
    pub types: BTreeSet<String>,
    /// Complexity weight (1.0 light – 5.0 heavy).
    pub weight: f32,
    /// Supported player count `(min, max)`.
    pub players: (u32, u32),
    /// Community-voted best player count.
    pub best_players: f32,
    /// Play time range in minutes `(min, max)`.
    pub play_time: (u32, u32),
    /// Average play time in minutes.
    pub avg_play_time: f32,
    /// Year of first publication.
    pub year_published: i32,
    /// Average user rating (1–10).
    pub avg_rating: f32,
}

impl Item {
    /// Labels of the given family.
    #[must_use]
    pub fn labels(&self, field: LabelField) -> &BTreeSet<String> {
        match field {
            LabelField::Categories => &self.categories,
            LabelField::Mechanics => &self.mechanics,
            LabelField::Types => &self.types,
        }
    }

    /// The numeric features used by the content-based encoder, in column
    /// order: `[weight, best_players, avg_play_time]`.
    #[must_use]
    pub fn numeric_features(&self) -> [f32; 3] {
        [self.weight, self.best_players, self.avg_play_time]
    }
}

// ---------------------------------------------------------------------------
// Score vectors
// ---------------------------------------------------------------------------

/// A dense per-item score array, index-aligned to the catalog order.
pub type ScoreVector = Vec<f32>;

/// Min-max normalize `scores` in place to \[0, 1\].
///
/// A constant (or empty) vector has no discriminative information and is
/// collapsed to all zeros instead of dividing by zero.
pub fn min_max_normalize(scores: &mut [f32]) {
    let (min, max) = scores
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| {
            (lo.min(s), hi.max(s))
        });

    let range = max - min;
    if !range.is_finite() || range <= f32::EPSILON {
        scores.fill(0.0);
        return;
    }

    for s in scores.iter_mut() {
        *s = (*s - min) / range;
    }
}

/// Whether a score vector carries no signal at all.
#[must_use]
pub fn is_degenerate(scores: &[f32]) -> bool {
    scores.iter().all(|&s| s == 0.0)
}

/// Round to four decimal places (the precision exposed in result rows).
#[must_use]
pub fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

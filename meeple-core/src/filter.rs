//! Hard attribute filters.
//!
//! One [`AttributeFilters`] value drives three places: the content-based
//! query vector, the relevance candidate pool and the final ranking pass.
//! All active filters are AND-combined; an empty label set or an unset
//! range imposes no constraint.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MeepleError, Result};
use crate::types::{Item, LabelField};

// ---------------------------------------------------------------------------
// Numeric ranges
// ---------------------------------------------------------------------------

/// Inclusive numeric range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    /// Lower bound (inclusive).
    pub min: f32,
    /// Upper bound (inclusive).
    pub max: f32,
}

impl NumericRange {
    /// Create a range. Bounds are checked by [`NumericRange::validate`].
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies within the range.
    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Whether `[lo, hi]` overlaps the range.
    #[must_use]
    pub fn overlaps(&self, lo: f32, hi: f32) -> bool {
        hi >= self.min && lo <= self.max
    }

    /// Centre of the range.
    #[must_use]
    pub fn midpoint(&self) -> f32 {
        (self.min + self.max) / 2.0
    }

    /// # Errors
    /// Returns [`MeepleError::InvalidInput`] for non-finite bounds or
    /// `min > max`.
    pub fn validate(&self, key: FilterKey) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(MeepleError::InvalidInput(format!(
                "{key} range has a non-finite bound"
            )));
        }
        if self.min > self.max {
            return Err(MeepleError::InvalidInput(format!(
                "{key} range is inverted: min {} > max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Filter keys and values
// ---------------------------------------------------------------------------

/// Every recognized filter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    /// Label set over item categories.
    Categories,
    /// Label set over item mechanics.
    Mechanics,
    /// Label set over item types.
    Types,
    /// Range over complexity weight.
    Weight,
    /// Range over publication year.
    YearPublished,
    /// Range overlapping the supported player count.
    Players,
    /// Range overlapping the play time.
    PlayTime,
    /// Floor on the average rating.
    MinRating,
}

impl FilterKey {
    /// The kind of value this key accepts.
    #[must_use]
    pub fn kind(self) -> FilterKind {
        match self {
            Self::Categories | Self::Mechanics | Self::Types => FilterKind::Labels,
            Self::Weight | Self::YearPublished | Self::Players | Self::PlayTime => {
                FilterKind::Range
            }
            Self::MinRating => FilterKind::Floor,
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Categories => "categories",
            Self::Mechanics => "mechanics",
            Self::Types => "types",
            Self::Weight => "weight",
            Self::YearPublished => "year_published",
            Self::Players => "players",
            Self::PlayTime => "play_time",
            Self::MinRating => "min_rating",
        };
        write!(f, "{name}")
    }
}

impl FromStr for FilterKey {
    type Err = MeepleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "categories" => Ok(Self::Categories),
            "mechanics" => Ok(Self::Mechanics),
            "types" => Ok(Self::Types),
            "weight" => Ok(Self::Weight),
            "year_published" => Ok(Self::YearPublished),
            "players" => Ok(Self::Players),
            "play_time" => Ok(Self::PlayTime),
            "min_rating" => Ok(Self::MinRating),
            _ => Err(MeepleError::InvalidInput(format!("unknown filter key: '{s}'"))),
        }
    }
}

/// Value kind accepted by a [`FilterKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// A set of allowed labels.
    Labels,
    /// A `[min, max]` pair.
    Range,
    /// A single lower bound.
    Floor,
}

/// A filter value as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Allowed labels (matched case-insensitively).
    Labels(Vec<String>),
    /// Inclusive `[min, max]`.
    Range(NumericRange),
    /// Minimum value.
    Floor(f32),
}

impl FilterValue {
    fn kind(&self) -> FilterKind {
        match self {
            Self::Labels(_) => FilterKind::Labels,
            Self::Range(_) => FilterKind::Range,
            Self::Floor(_) => FilterKind::Floor,
        }
    }
}

// ---------------------------------------------------------------------------
// AttributeFilters
// ---------------------------------------------------------------------------

/// The typed set of attribute filters for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributeFilters {
    /// Item must carry at least one of these categories.
    pub categories: Vec<String>,
    /// Item must carry at least one of these mechanics.
    pub mechanics: Vec<String>,
    /// Item must carry at least one of these types.
    pub types: Vec<String>,
    /// Complexity weight must lie in the range.
    pub weight: Option<NumericRange>,
    /// Publication year must lie in the range.
    pub year_published: Option<NumericRange>,
    /// Supported player counts must overlap the range.
    pub players: Option<NumericRange>,
    /// Play time must overlap the range (minutes).
    pub play_time: Option<NumericRange>,
    /// Average rating must be at least this.
    pub min_rating: Option<f32>,
}

impl AttributeFilters {
    /// Build filters from loosely-typed `(key, value)` pairs.
    ///
    /// # Errors
    /// Returns [`MeepleError::InvalidInput`] for an unknown key, a value of
    /// the wrong kind for its key, or an invalid range.
    pub fn from_entries<K, I>(entries: I) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, FilterValue)>,
    {
        let mut filters = Self::default();
        for (key, value) in entries {
            let key: FilterKey = key.as_ref().parse()?;
            match (key, value) {
                (FilterKey::Categories, FilterValue::Labels(v)) => filters.categories = v,
                (FilterKey::Mechanics, FilterValue::Labels(v)) => filters.mechanics = v,
                (FilterKey::Types, FilterValue::Labels(v)) => filters.types = v,
                (FilterKey::Weight, FilterValue::Range(r)) => filters.weight = Some(r),
                (FilterKey::YearPublished, FilterValue::Range(r)) => {
                    filters.year_published = Some(r);
                }
                (FilterKey::Players, FilterValue::Range(r)) => filters.players = Some(r),
                (FilterKey::PlayTime, FilterValue::Range(r)) => filters.play_time = Some(r),
                (FilterKey::MinRating, FilterValue::Floor(f)) => filters.min_rating = Some(f),
                (key, value) => {
                    return Err(MeepleError::InvalidInput(format!(
                        "filter '{key}' expects a {:?} value, got {:?}",
                        key.kind(),
                        value.kind()
                    )));
                }
            }
        }
        filters.validate()?;
        Ok(filters)
    }

    /// Labels selected for a label field.
    #[must_use]
    pub fn labels(&self, field: LabelField) -> &[String] {
        match field {
            LabelField::Categories => &self.categories,
            LabelField::Mechanics => &self.mechanics,
            LabelField::Types => &self.types,
        }
    }

    /// Check every range and the rating floor.
    ///
    /// # Errors
    /// Returns [`MeepleError::InvalidInput`] naming the first bad filter.
    pub fn validate(&self) -> Result<()> {
        for (key, range) in [
            (FilterKey::Weight, self.weight),
            (FilterKey::YearPublished, self.year_published),
            (FilterKey::Players, self.players),
            (FilterKey::PlayTime, self.play_time),
        ] {
            if let Some(r) = range {
                r.validate(key)?;
            }
        }
        if let Some(floor) = self.min_rating {
            if !floor.is_finite() {
                return Err(MeepleError::InvalidInput("min_rating must be finite".into()));
            }
        }
        Ok(())
    }

    /// Whether no filter is active.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.predicate().is_unconstrained()
    }

    /// Compile into a predicate with normalized label sets.
    #[must_use]
    pub fn predicate(&self) -> FilterPredicate {
        FilterPredicate {
            categories: normalize_labels(&self.categories),
            mechanics: normalize_labels(&self.mechanics),
            types: normalize_labels(&self.types),
            weight: self.weight,
            year_published: self.year_published,
            players: self.players,
            play_time: self.play_time,
            min_rating: self.min_rating,
        }
    }
}

fn normalize_labels(labels: &[String]) -> HashSet<String> {
    labels
        .iter()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Compiled, item-testable form of [`AttributeFilters`].
#[derive(Debug, Clone)]
pub struct FilterPredicate {
    categories: HashSet<String>,
    mechanics: HashSet<String>,
    types: HashSet<String>,
    weight: Option<NumericRange>,
    year_published: Option<NumericRange>,
    players: Option<NumericRange>,
    play_time: Option<NumericRange>,
    min_rating: Option<f32>,
}

impl FilterPredicate {
    /// Whether no filter is active.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.categories.is_empty()
            && self.mechanics.is_empty()
            && self.types.is_empty()
            && self.weight.is_none()
            && self.year_published.is_none()
            && self.players.is_none()
            && self.play_time.is_none()
            && self.min_rating.is_none()
    }

    /// Whether `item` passes every active filter.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn matches(&self, item: &Item) -> bool {
        let labels_ok = [
            (&self.categories, LabelField::Categories),
            (&self.mechanics, LabelField::Mechanics),
            (&self.types, LabelField::Types),
        ]
        .into_iter()
        .all(|(selected, field)| {
            selected.is_empty()
                || item
                    .labels(field)
                    .iter()
                    .any(|l| selected.contains(&l.trim().to_lowercase()))
        });
        if !labels_ok {
            return false;
        }

        if let Some(r) = self.weight {
            if !r.contains(item.weight) {
                return false;
            }
        }
        if let Some(r) = self.year_published {
            if !r.contains(item.year_published as f32) {
                return false;
            }
        }
        if let Some(r) = self.players {
            if !r.overlaps(item.players.0 as f32, item.players.1 as f32) {
                return false;
            }
        }
        if let Some(r) = self.play_time {
            if !r.overlaps(item.play_time.0 as f32, item.play_time.1 as f32) {
                return false;
            }
        }
        if let Some(floor) = self.min_rating {
            if item.avg_rating < floor {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Play-time buckets
// ---------------------------------------------------------------------------

/// Coarse play-time choices offered to users, mapped to minute ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayTimeBucket {
    /// Under 30 minutes.
    Under30,
    /// 30 to 60 minutes.
    From30To60,
    /// 60 to 90 minutes.
    From60To90,
    /// 90 to 120 minutes.
    From90To120,
    /// Over two hours.
    Over120,
}

impl PlayTimeBucket {
    /// The inclusive minute range for this bucket.
    #[must_use]
    pub fn range(self) -> NumericRange {
        match self {
            Self::Under30 => NumericRange::new(0.0, 30.0),
            Self::From30To60 => NumericRange::new(30.0, 60.0),
            Self::From60To90 => NumericRange::new(60.0, 90.0),
            Self::From90To120 => NumericRange::new(90.0, 120.0),
            Self::Over120 => NumericRange::new(120.0, 9999.0),
        }
    }
}

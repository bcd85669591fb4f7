//! Error types for the meeple core library.

use thiserror::Error;

use crate::types::ItemId;

/// Top-level error type for all meeple core operations.
///
/// Degenerate signals and empty result sets are not errors; they are
/// reported as values by the scorers and the ensemble engine.
#[derive(Error, Debug)]
pub enum MeepleError {
    /// The request or an argument is invalid (empty liked set, malformed
    /// range, blend weight out of bounds, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Two tables that must be index-aligned disagree on their shape.
    #[error("Shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Which table or vector is misaligned.
        what: String,
        /// Expected length / dimensionality.
        expected: usize,
        /// Actual length / dimensionality.
        actual: usize,
    },

    /// An item id was not found in the catalog.
    #[error("Item not found: {0}")]
    UnknownItem(ItemId),

    /// The same item id appears twice in a catalog feed.
    #[error("Duplicate item id in catalog: {0}")]
    DuplicateItem(ItemId),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, MeepleError>;

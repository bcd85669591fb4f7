//! # Meeple Core Library
//!
//! Hybrid board-game recommendation: three independent signals blended
//! into one ranking over a fixed item catalog.
//!
//! - **Collaborative** — a new user's likes folded into a precomputed item
//!   embedding space ([`cf`])
//! - **Content-based** — cosine similarity of an attribute preference to
//!   each item's weighted feature vector ([`cbf`])
//! - **Relevance** — an external oracle's judgement of how well each item
//!   fits a free-text description ([`relevance`])
//!
//! The [`ensemble`] engine re-routes weight away from signals that carry
//! no information, blends the rest, removes excluded and filtered items
//! and returns the top N.
//!
//! ```no_run
//! # async fn demo() -> meeple_core::Result<()> {
//! use std::sync::Arc;
//! use meeple_core::{
//!     EmbeddingStore, EnsembleEngine, ItemCatalog, MeepleConfig, NullOracle,
//!     RecommendationRequest, RecommenderContext,
//! };
//!
//! let catalog = ItemCatalog::from_file("items.json".as_ref())?;
//! let embeddings = EmbeddingStore::from_file("item_factors.json".as_ref())?;
//! let context = RecommenderContext::build(catalog, embeddings, MeepleConfig::default())?;
//! let engine = EnsembleEngine::new(context, Arc::new(NullOracle));
//!
//! let ranked = engine.recommend(&RecommendationRequest::default()).await?;
//! for row in ranked.rows() {
//!     println!("{} {:.4}", row.name, row.score);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod cbf;
pub mod cf;
pub mod config;
pub mod context;
pub mod embedding;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod filter;
pub mod query;
pub mod relevance;
pub mod types;

pub use catalog::ItemCatalog;
pub use config::MeepleConfig;
pub use context::RecommenderContext;
pub use embedding::EmbeddingStore;
pub use ensemble::{EnsembleEngine, Recommendation, Recommendations};
pub use error::{MeepleError, Result};
pub use features::FeatureMatrix;
pub use filter::{AttributeFilters, NumericRange, PlayTimeBucket};
pub use query::{BlendPreset, RecommendationRequest};
pub use relevance::{Candidate, NullOracle, OracleError, RelevanceOracle, StaticOracle};
pub use types::*;

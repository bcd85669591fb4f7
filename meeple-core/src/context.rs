//! The read-only tables every request scores against.

use std::sync::Arc;

use tracing::info;

use crate::catalog::ItemCatalog;
use crate::config::MeepleConfig;
use crate::embedding::EmbeddingStore;
use crate::error::{MeepleError, Result};
use crate::features::FeatureMatrix;

/// Item catalog, embedding store, feature matrix and configuration, checked
/// for index alignment once and then shared across requests.
///
/// Cloning is cheap; the tables are reference counted and never mutated.
#[derive(Debug, Clone)]
pub struct RecommenderContext {
    catalog: Arc<ItemCatalog>,
    embeddings: Arc<EmbeddingStore>,
    features: Arc<FeatureMatrix>,
    config: Arc<MeepleConfig>,
}

impl RecommenderContext {
    /// Bundle the tables.
    ///
    /// # Errors
    /// Returns [`MeepleError::ShapeMismatch`] if the embedding store or the
    /// feature matrix does not have one row per catalog item,
    /// [`MeepleError::InvalidInput`] if a feature row does not encode the
    /// catalog item at its index, and [`MeepleError::Config`] if `config`
    /// fails validation.
    ///
    /// Embedding rows cannot be checked against items; their order is
    /// trusted to be the catalog's.
    pub fn new(
        catalog: Arc<ItemCatalog>,
        embeddings: Arc<EmbeddingStore>,
        features: Arc<FeatureMatrix>,
        config: MeepleConfig,
    ) -> Result<Self> {
        config.validate()?;

        if embeddings.len() != catalog.len() {
            return Err(MeepleError::ShapeMismatch {
                what: "embedding rows".into(),
                expected: catalog.len(),
                actual: embeddings.len(),
            });
        }
        if features.len() != catalog.len() {
            return Err(MeepleError::ShapeMismatch {
                what: "feature rows".into(),
                expected: catalog.len(),
                actual: features.len(),
            });
        }
        if let Some(idx) = features.first_mismatch(&catalog) {
            return Err(MeepleError::InvalidInput(format!(
                "feature row {idx} does not encode catalog item {idx}; \
                 the matrix was built from another catalog or item order"
            )));
        }

        info!(
            items = catalog.len(),
            latent_dims = embeddings.dimensions(),
            feature_dims = features.dimensions(),
            "recommender context ready"
        );

        Ok(Self {
            catalog,
            embeddings,
            features,
            config: Arc::new(config),
        })
    }

    /// Build the feature matrix from the catalog with the configured block
    /// weights, then bundle as [`RecommenderContext::new`].
    ///
    /// # Errors
    /// Same as [`RecommenderContext::new`].
    pub fn build(
        catalog: ItemCatalog,
        embeddings: EmbeddingStore,
        config: MeepleConfig,
    ) -> Result<Self> {
        let features = FeatureMatrix::build(&catalog, config.cbf.weights);
        Self::new(Arc::new(catalog), Arc::new(embeddings), Arc::new(features), config)
    }

    /// The item catalog.
    #[must_use]
    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    /// The item embedding store.
    #[must_use]
    pub fn embeddings(&self) -> &EmbeddingStore {
        &self.embeddings
    }

    /// The precomputed feature matrix.
    #[must_use]
    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &MeepleConfig {
        &self.config
    }
}

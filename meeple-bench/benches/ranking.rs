//! meeple benchmark suite.
//!
//! Performance targets on a 5 000-game catalog with 32 latent factors:
//!   feature_matrix_build ............ < 20ms
//!   cf_fold_in_10_likes ............. < 1ms
//!   cbf_score ....................... < 2ms
//!   ensemble_rank ................... < 2ms
//!   ensemble_recommend_static_oracle  < 5ms
//!
//! Logging follows `[general] log_level` (default `info`); set
//! `RUST_LOG=meeple_core=debug` to see per-request diagnostics instead.

use std::collections::BTreeSet;
use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use meeple_core::cbf::CbfScorer;
use meeple_core::cf::CfScorer;
use meeple_core::config::{FeatureWeights, MeepleConfig};
use meeple_core::{
    AttributeFilters, EmbeddingStore, EnsembleEngine, FeatureMatrix, Item, ItemCatalog, ItemId,
    NumericRange, RecommendationRequest, RecommenderContext, StaticOracle,
};

const ITEMS: usize = 5_000;
const FACTORS: usize = 32;

const CATEGORIES: &[&str] = &[
    "Abstract Strategy", "Adventure", "Animals", "Economic", "Fantasy", "Horror", "Medieval",
    "Science Fiction", "Trains", "Wargame",
];
const MECHANICS: &[&str] = &[
    "Area Control", "Cooperative Game", "Deck Building", "Dice Rolling", "Hand Management",
    "Network Building", "Set Collection", "Tile Placement", "Worker Placement",
];
const TYPES: &[&str] = &["Family", "Party", "Strategy", "Thematic"];

fn pick(rng: &mut StdRng, pool: &[&str], count: usize) -> BTreeSet<String> {
    (0..count).map(|_| pool[rng.gen_range(0..pool.len())].to_string()).collect()
}

#[allow(clippy::cast_possible_truncation)]
fn make_item(rng: &mut StdRng, i: usize) -> Item {
    let min_time = rng.gen_range(15..90);
    let min_players = rng.gen_range(1..3);
    Item {
        id: ItemId(i as u32 + 1),
        name: format!("Game {i}"),
        description: format!("Synthetic game number {i}."),
        categories: pick(rng, CATEGORIES, 2),
        mechanics: pick(rng, MECHANICS, 3),
        types: pick(rng, TYPES, 1),
        weight: rng.gen_range(1.0..5.0),
        players: (min_players, min_players + rng.gen_range(0..5)),
        best_players: rng.gen_range(1.0..5.0),
        play_time: (min_time, min_time + rng.gen_range(0..120)),
        avg_play_time: rng.gen_range(20.0..180.0),
        year_published: rng.gen_range(1980..2024),
        avg_rating: rng.gen_range(5.0..9.0),
    }
}

fn synthetic() -> (ItemCatalog, EmbeddingStore) {
    let mut rng = StdRng::seed_from_u64(42);
    let items: Vec<Item> = (0..ITEMS).map(|i| make_item(&mut rng, i)).collect();
    let rows: Vec<Vec<f32>> = (0..ITEMS)
        .map(|_| (0..FACTORS).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();
    (
        ItemCatalog::new(items).expect("catalog"),
        EmbeddingStore::from_rows(&rows).expect("embeddings"),
    )
}

fn request() -> RecommendationRequest {
    RecommendationRequest {
        liked: (1..=10).map(ItemId).collect(),
        disliked: vec![ItemId(11), ItemId(12)],
        filters: AttributeFilters {
            categories: vec!["Fantasy".into()],
            mechanics: vec!["Deck Building".into(), "Hand Management".into()],
            weight: Some(NumericRange::new(2.0, 4.0)),
            ..Default::default()
        },
        description: "a fantasy deck builder with a campaign".into(),
        ..Default::default()
    }
}

fn engine() -> EnsembleEngine {
    let (catalog, embeddings) = synthetic();
    let oracle: StaticOracle = catalog
        .items()
        .iter()
        .step_by(7)
        .map(|item| (item.id, 0.8))
        .collect();
    let context =
        RecommenderContext::build(catalog, embeddings, MeepleConfig::default()).expect("context");
    EnsembleEngine::new(context, Arc::new(oracle))
}

/// `RUST_LOG` wins; otherwise the `[general] log_level` of the config.
fn init_tracing(config: &MeepleConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Benchmark: one-hot + scaled feature matrix over the whole catalog (target: < 20ms).
fn bench_feature_matrix(c: &mut Criterion) {
    let (catalog, _) = synthetic();
    let weights = FeatureWeights::default();
    c.bench_function("feature_matrix_build", |b| {
        b.iter(|| black_box(FeatureMatrix::build(black_box(&catalog), weights)));
    });
}

/// Benchmark: CF fold-in and scoring for ten likes (target: < 1ms).
fn bench_cf(c: &mut Criterion) {
    let (_, embeddings) = synthetic();
    let scorer = CfScorer::new(&MeepleConfig::default().cf);
    let liked: Vec<usize> = (0..10).collect();
    c.bench_function("cf_fold_in_10_likes", |b| {
        b.iter(|| black_box(scorer.score(black_box(&embeddings), black_box(&liked))));
    });
}

/// Benchmark: CBF cosine scoring against attribute preferences (target: < 2ms).
fn bench_cbf(c: &mut Criterion) {
    let (catalog, _) = synthetic();
    let features = FeatureMatrix::build(&catalog, FeatureWeights::default());
    let scorer = CbfScorer::new(&MeepleConfig::default().cbf);
    let prefs = request().filters;
    c.bench_function("cbf_score", |b| {
        b.iter(|| black_box(scorer.score(black_box(&features), black_box(&prefs))));
    });
}

/// Benchmark: blend, filter and top-N over precomputed signals (target: < 2ms).
fn bench_rank(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let engine = engine();
    let request = request();
    let signals = rt.block_on(engine.signals(&request));
    c.bench_function("ensemble_rank", |b| {
        b.iter(|| black_box(engine.rank(black_box(&request), black_box(&signals))));
    });
}

/// Benchmark: the full request path with an in-memory oracle (target: < 5ms).
fn bench_recommend(c: &mut Criterion) {
    init_tracing(&MeepleConfig::default());
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let engine = engine();
    let request = request();
    c.bench_function("ensemble_recommend_static_oracle", |b| {
        b.iter(|| black_box(rt.block_on(engine.recommend(black_box(&request)))));
    });
}

criterion_group!(
    benches,
    bench_feature_matrix,
    bench_cf,
    bench_cbf,
    bench_rank,
    bench_recommend,
);
criterion_main!(benches);

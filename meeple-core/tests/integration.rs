//! Integration Tests — End-to-End Recommendation Flows
//!
//! These tests drive the public API the way a host application does:
//! load feeds, build the context once, then serve requests through the
//! ensemble engine with different oracles.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use meeple_core::cbf::CbfScorer;
use meeple_core::cf::CfScorer;
use meeple_core::config::MeepleConfig;
use meeple_core::relevance::Candidate;
use meeple_core::{
    AttributeFilters, BlendPreset, EmbeddingStore, EnsembleEngine, FeatureMatrix, Item, ItemCatalog,
    ItemId, NullOracle, NumericRange, OracleError, PlayTimeBucket, RecommendationRequest,
    Recommendations, RecommenderContext, RelevanceOracle, StaticOracle,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const AZUL: ItemId = ItemId(230_802);
const BRASS: ItemId = ItemId(224_517);
const CASCADIA: ItemId = ItemId(295_947);
const DUNE: ItemId = ItemId(316_554);
const EVERDELL: ItemId = ItemId(199_792);
const GLOOMHAVEN: ItemId = ItemId(174_430);

fn labels(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}

#[allow(clippy::too_many_arguments, clippy::cast_precision_loss)]
fn game(
    id: ItemId,
    name: &str,
    categories: &[&str],
    mechanics: &[&str],
    weight: f32,
    play_time: (u32, u32),
    year: i32,
    rating: f32,
) -> Item {
    Item {
        id,
        name: name.into(),
        description: format!("{name}: a board game."),
        categories: labels(categories),
        mechanics: labels(mechanics),
        types: labels(&["Strategy"]),
        weight,
        players: (1, 4),
        best_players: 3.0,
        play_time,
        avg_play_time: (play_time.0 + play_time.1) as f32 / 2.0,
        year_published: year,
        avg_rating: rating,
    }
}

fn catalog() -> ItemCatalog {
    ItemCatalog::new(vec![
        game(AZUL, "Azul", &["Abstract Strategy"], &["Tile Placement"], 1.8, (30, 45), 2017, 7.8),
        game(
            BRASS,
            "Brass: Birmingham",
            &["Economic"],
            &["Network Building"],
            3.9,
            (60, 120),
            2018,
            8.6,
        ),
        game(CASCADIA, "Cascadia", &["Animals"], &["Tile Placement"], 1.9, (30, 45), 2021, 7.9),
        game(
            DUNE,
            "Dune: Imperium",
            &["Science Fiction"],
            &["Deck Building", "Worker Placement"],
            3.0,
            (60, 120),
            2020,
            8.4,
        ),
        game(
            EVERDELL,
            "Everdell",
            &["Animals", "Fantasy"],
            &["Worker Placement"],
            2.8,
            (40, 80),
            2018,
            8.0,
        ),
        game(
            GLOOMHAVEN,
            "Gloomhaven",
            &["Adventure", "Fantasy"],
            &["Hand Management"],
            3.9,
            (60, 120),
            2017,
            8.6,
        ),
    ])
    .expect("catalog")
}

/// Brass shares Azul's latent vector, so liking Azul gives Brass the
/// global maximum CF score.
fn embeddings() -> EmbeddingStore {
    EmbeddingStore::from_rows(&[
        vec![1.0, 0.1, 0.0],
        vec![1.0, 0.1, 0.0],
        vec![0.9, 0.2, 0.1],
        vec![0.1, 1.0, 0.2],
        vec![0.6, 0.5, 0.0],
        vec![-0.5, 0.2, 1.0],
    ])
    .expect("embeddings")
}

fn context_with(config: MeepleConfig) -> RecommenderContext {
    RecommenderContext::build(catalog(), embeddings(), config).expect("context")
}

fn engine(oracle: Arc<dyn RelevanceOracle>) -> EnsembleEngine {
    EnsembleEngine::new(context_with(MeepleConfig::default()), oracle)
}

/// Every item has identical attributes, so content similarity is constant.
fn uniform_engine(oracle: Arc<dyn RelevanceOracle>) -> EnsembleEngine {
    let items = (1..=5)
        .map(|i| {
            let name = format!("Clone {i}");
            game(ItemId(i), &name, &["Party"], &["Voting"], 1.5, (15, 30), 2019, 6.5)
        })
        .collect();
    let catalog = ItemCatalog::new(items).expect("catalog");
    let embeddings = EmbeddingStore::from_rows(&vec![vec![0.3, 0.3]; 5]).expect("embeddings");
    let context =
        RecommenderContext::build(catalog, embeddings, MeepleConfig::default()).expect("context");
    EnsembleEngine::new(context, oracle)
}

struct SlowOracle;

#[async_trait]
impl RelevanceOracle for SlowOracle {
    async fn score(&self, _: &str, _: &[Candidate]) -> Result<HashMap<ItemId, f32>, OracleError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(HashMap::new())
    }
}

// ---------------------------------------------------------------------------
// Individual signals
// ---------------------------------------------------------------------------

#[test]
fn cf_signal_is_aligned_bounded_and_informative() {
    let catalog = catalog();
    let liked = catalog.indices_of(&[AZUL]);
    let scores = CfScorer::new(&MeepleConfig::default().cf)
        .score(&embeddings(), &liked)
        .expect("cf");

    assert_eq!(scores.len(), catalog.len());
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    assert!(scores.iter().any(|&s| s > 0.0));
}

#[test]
fn cbf_signal_is_aligned_and_bounded() {
    let catalog = catalog();
    let features = FeatureMatrix::build(&catalog, MeepleConfig::default().cbf.weights);
    let prefs = AttributeFilters {
        categories: vec!["Fantasy".into()],
        play_time: Some(PlayTimeBucket::From60To90.range()),
        ..Default::default()
    };
    let scores = CbfScorer::new(&MeepleConfig::default().cbf).score(&features, &prefs);

    assert_eq!(scores.len(), catalog.len());
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));

    let (best, _) = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .expect("non-empty");
    let best = catalog.get(best).expect("item");
    assert!(best.categories.contains("Fantasy"), "best match was {}", best.name);
}

// ---------------------------------------------------------------------------
// Ranking scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn weight_filter_removes_global_cf_maximum() {
    let engine = engine(Arc::new(NullOracle));
    let req = RecommendationRequest {
        liked: vec![AZUL],
        filters: AttributeFilters {
            weight: Some(NumericRange::new(1.5, 3.5)),
            ..Default::default()
        },
        alpha: 0.5,
        beta: 0.0,
        ..Default::default()
    };

    let out = engine.recommend(&req).await.expect("recommend");
    assert!(!out.is_empty());
    assert!(!out.ids().contains(&BRASS));
    assert!(!out.ids().contains(&AZUL));
    assert!(out
        .rows()
        .iter()
        .all(|r| (1.5..=3.5).contains(&r.item.weight)));
}

#[tokio::test]
async fn liked_item_pulls_its_neighbour_to_the_top() {
    let engine = engine(Arc::new(NullOracle));
    let req = RecommendationRequest {
        liked: vec![AZUL],
        alpha: 1.0,
        beta: 0.0,
        ..Default::default()
    };
    let out = engine.recommend(&req).await.expect("recommend");
    assert_eq!(out.ids().first(), Some(&BRASS));
}

#[tokio::test]
async fn all_signals_empty_yields_empty_marker() {
    let engine = uniform_engine(Arc::new(NullOracle));
    let out = engine
        .recommend(&RecommendationRequest::default())
        .await
        .expect("recommend");
    assert_eq!(out, Recommendations::Empty);
}

#[tokio::test]
async fn missing_structured_signals_reduce_to_relevance() {
    let oracle: StaticOracle = [(ItemId(2), 0.75), (ItemId(4), 0.5)].into_iter().collect();
    let engine = uniform_engine(Arc::new(oracle));
    let req = RecommendationRequest {
        description: "something silly for a big group".into(),
        ..Default::default()
    }
    .with_preset(BlendPreset::B);

    let out = engine.recommend(&req).await.expect("recommend");
    let scores: Vec<(ItemId, f32)> = out.rows().iter().map(|r| (r.id, r.score)).collect();
    assert_eq!(scores, vec![(ItemId(2), 0.75), (ItemId(4), 0.5)]);
    assert!(out.rows().iter().all(|r| r.components.cf == 0.0 && r.components.cbf == 0.0));
}

#[tokio::test(start_paused = true)]
async fn oracle_timeout_still_answers() {
    let mut config = MeepleConfig::default();
    config.relevance.timeout_ms = 25;
    let engine = EnsembleEngine::new(context_with(config), Arc::new(SlowOracle));
    let req = RecommendationRequest {
        liked: vec![AZUL],
        description: "a relaxing puzzle".into(),
        ..Default::default()
    };

    let signals = engine.signals(&req).await;
    assert!(signals.relevance.iter().all(|&s| s == 0.0));

    let out = engine.recommend(&req).await.expect("recommend");
    assert!(!out.is_empty());
    assert!(out.rows().iter().all(|r| r.components.relevance == 0.0));
}

#[tokio::test]
async fn repeated_requests_are_identical() {
    let oracle: StaticOracle =
        [(DUNE, 0.9), (EVERDELL, 0.6), (GLOOMHAVEN, 0.3)].into_iter().collect();
    let engine = engine(Arc::new(oracle));
    let req = RecommendationRequest {
        liked: vec![CASCADIA],
        disliked: vec![BRASS],
        filters: AttributeFilters {
            mechanics: vec!["Worker Placement".into(), "Tile Placement".into()],
            ..Default::default()
        },
        description: "medium weight euro".into(),
        top_n: Some(3),
        ..Default::default()
    };

    let first = engine.recommend(&req).await.expect("first");
    let second = engine.recommend(&req).await.expect("second");
    assert_eq!(first, second);
    assert!(first.len() <= 3);
    assert!(!first.ids().contains(&CASCADIA));
    assert!(!first.ids().contains(&BRASS));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_context() {
    let oracle: StaticOracle = [(GLOOMHAVEN, 1.0)].into_iter().collect();
    let engine = engine(Arc::new(oracle));

    let handles: Vec<_> = [AZUL, CASCADIA, DUNE, EVERDELL]
        .into_iter()
        .map(|liked| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let req = RecommendationRequest {
                    liked: vec![liked],
                    description: "campaign".into(),
                    ..Default::default()
                };
                (liked, engine.recommend(&req).await)
            })
        })
        .collect();

    for handle in handles {
        let (liked, out) = handle.await.expect("join");
        let out = out.expect("recommend");
        assert!(!out.ids().contains(&liked));
    }
}

// ---------------------------------------------------------------------------
// Feeds and snapshots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_feeds_and_feature_snapshot_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let items_path = dir.path().join("items.json");
    let factors_path = dir.path().join("item_factors.json");
    let snapshot_path = dir.path().join("features.bin");

    let items = catalog().items().to_vec();
    let items_json = serde_json::to_string(&items).expect("items json");
    std::fs::write(&items_path, items_json).expect("write items");
    std::fs::write(
        &factors_path,
        "[[1.0,0.1,0.0],[1.0,0.1,0.0],[0.9,0.2,0.1],[0.1,1.0,0.2],[0.6,0.5,0.0],[-0.5,0.2,1.0]]",
    )
    .expect("write factors");

    let catalog = ItemCatalog::from_file(&items_path).expect("load catalog");
    let factors = EmbeddingStore::from_file(&factors_path).expect("load factors");
    FeatureMatrix::build(&catalog, MeepleConfig::default().cbf.weights)
        .save(&snapshot_path)
        .expect("save snapshot");
    let features = FeatureMatrix::load(&snapshot_path).expect("load snapshot");

    let loaded = EnsembleEngine::new(
        RecommenderContext::new(
            Arc::new(catalog),
            Arc::new(factors),
            Arc::new(features),
            MeepleConfig::default(),
        )
        .expect("context"),
        Arc::new(NullOracle),
    );
    let built = engine(Arc::new(NullOracle));

    let req = RecommendationRequest {
        liked: vec![EVERDELL],
        filters: AttributeFilters {
            categories: vec!["Fantasy".into(), "Animals".into()],
            ..Default::default()
        },
        ..Default::default()
    };
    assert_eq!(
        loaded.recommend(&req).await.expect("loaded"),
        built.recommend(&req).await.expect("built")
    );
}

#[test]
fn request_json_drives_a_full_request() {
    let req = RecommendationRequest::from_json(
        r#"{
            "liked": [230802],
            "excluded": [295947],
            "filters": {"play_time": {"min": 30, "max": 60}, "min_rating": 7.0},
            "alpha": 0.67,
            "beta": 0.25
        }"#,
    )
    .expect("parse");
    req.validate().expect("valid");
    assert_eq!(req, RecommendationRequest {
        liked: vec![AZUL],
        excluded: vec![CASCADIA],
        filters: AttributeFilters {
            play_time: Some(NumericRange::new(30.0, 60.0)),
            min_rating: Some(7.0),
            ..Default::default()
        },
        ..Default::default()
    }
    .with_preset(BlendPreset::B));
}

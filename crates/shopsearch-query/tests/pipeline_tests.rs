//! End-to-end pipeline tests with in-process fakes for the embedder and
//! the product store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use shopsearch_core::{
    Candidate, Embedder, Lane, Product, ProductStore, Result, SearchConfig, SearchError,
    SearchRequest, HYBRID_SCORE_KEY,
};
use shopsearch_query::SearchEngine;

/// Embedder that counts invocations and can be told to fail.
struct FakeEmbedder {
    calls: AtomicUsize,
    fail: Option<fn() -> SearchError>,
}

impl FakeEmbedder {
    fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: None,
        }
    }

    fn timing_out() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: Some(|| SearchError::EmbeddingTimeout { elapsed_ms: 5000 }),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(fail) = self.fail {
            return Err(fail());
        }
        Ok(vec![0.1; 8])
    }

    fn dimension(&self) -> usize {
        8
    }
}

/// Store serving canned lane results and a fixed product map.
struct FakeStore {
    ann: Vec<Candidate>,
    lexical: Vec<Candidate>,
    products: HashMap<String, Product>,
    ann_fails: bool,
    ann_calls: AtomicUsize,
    lexical_calls: AtomicUsize,
    hydrate_calls: AtomicUsize,
}

impl FakeStore {
    fn new(ann: Vec<Candidate>, lexical: Vec<Candidate>, ids: &[&str]) -> Self {
        let products = ids
            .iter()
            .map(|id| {
                (
                    id.to_string(),
                    Product {
                        id: id.to_string(),
                        title: format!("{} title", id),
                        embedding: None,
                        product_data: json!({"name": format!("{} name", id)}),
                    },
                )
            })
            .collect();

        Self {
            ann,
            lexical,
            products,
            ann_fails: false,
            ann_calls: AtomicUsize::new(0),
            lexical_calls: AtomicUsize::new(0),
            hydrate_calls: AtomicUsize::new(0),
        }
    }

    fn with_failing_ann(mut self) -> Self {
        self.ann_fails = true;
        self
    }
}

#[async_trait]
impl ProductStore for FakeStore {
    async fn ann_search(&self, _embedding: &[f32], _k: u32) -> Result<Vec<Candidate>> {
        self.ann_calls.fetch_add(1, Ordering::SeqCst);
        if self.ann_fails {
            return Err(SearchError::retrieval(Lane::Ann, "index unavailable"));
        }
        Ok(self.ann.clone())
    }

    async fn lexical_search(&self, _query: &str, _k: u32) -> Result<Vec<Candidate>> {
        self.lexical_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lexical.clone())
    }

    async fn hydrate(&self, ids: &[String]) -> Result<HashMap<String, Product>> {
        self.hydrate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ids
            .iter()
            .filter_map(|id| self.products.get(id).cloned().map(|p| (id.clone(), p)))
            .collect())
    }

    async fn upsert_products(&self, _products: &[Product]) -> Result<()> {
        Ok(())
    }

    async fn count_products(&self) -> Result<u64> {
        Ok(self.products.len() as u64)
    }
}

fn lane(entries: &[(&str, u32)]) -> Vec<Candidate> {
    entries
        .iter()
        .map(|(id, rank)| Candidate::new(*id, *rank))
        .collect()
}

fn engine(store: FakeStore, embedder: FakeEmbedder) -> SearchEngine<FakeStore, FakeEmbedder> {
    SearchEngine::new(Arc::new(store), Arc::new(embedder), SearchConfig::default())
}

fn engine_with(
    store: Arc<FakeStore>,
    embedder: Arc<FakeEmbedder>,
) -> SearchEngine<FakeStore, FakeEmbedder> {
    SearchEngine::new(store, embedder, SearchConfig::default())
}

#[tokio::test]
async fn empty_query_rejected_before_embedding() {
    let store = Arc::new(FakeStore::new(vec![], vec![], &[]));
    let embedder = Arc::new(FakeEmbedder::ok());
    let engine = engine_with(store.clone(), embedder.clone());

    let err = engine.search(&SearchRequest::new("   ")).await.unwrap_err();

    assert!(matches!(err, SearchError::InvalidRequest { .. }));
    assert_eq!(err.http_status(), 400);
    assert_eq!(embedder.calls(), 0);
    assert_eq!(store.ann_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn embedding_timeout_aborts_before_retrieval() {
    let store = Arc::new(FakeStore::new(
        lane(&[("a", 1)]),
        lane(&[("a", 1)]),
        &["a"],
    ));
    let embedder = Arc::new(FakeEmbedder::timing_out());
    let engine = engine_with(store.clone(), embedder.clone());

    let err = engine.search(&SearchRequest::new("red shoes")).await.unwrap_err();

    assert!(matches!(err, SearchError::EmbeddingTimeout { .. }));
    assert_eq!(err.http_status(), 500);
    assert_eq!(store.ann_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.lexical_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.hydrate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn lane_failure_fails_whole_request() {
    let store = FakeStore::new(vec![], lane(&[("a", 1)]), &["a"]).with_failing_ann();
    let engine = engine(store, FakeEmbedder::ok());

    let err = engine.search(&SearchRequest::new("red shoes")).await.unwrap_err();
    assert!(matches!(err, SearchError::Retrieval { lane: Lane::Ann, .. }));
}

#[tokio::test]
async fn reference_fixture_end_to_end() {
    // ann=[(A,1),(B,2),(C,3)], lex=[(B,1),(D,2)], k=60 -> B, A, D, C.
    let store = FakeStore::new(
        lane(&[("A", 1), ("B", 2), ("C", 3)]),
        lane(&[("B", 1), ("D", 2)]),
        &["A", "B", "C", "D"],
    );
    let engine = engine(store, FakeEmbedder::ok());

    let response = engine.search(&SearchRequest::new("red shoes")).await.unwrap();

    assert_eq!(response.total_found, 4);
    let ids: Vec<&str> = response.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["B", "A", "D", "C"]);

    let b_score = response.results[0].score[HYBRID_SCORE_KEY];
    assert!((b_score - (1.0 / 61.0 + 1.0 / 62.0)).abs() < 1e-12);
}

#[tokio::test]
async fn partial_hydration_shrinks_results_in_order() {
    // Ten fused candidates, two with no backing record.
    let ann: Vec<(String, u32)> = (1..=10).map(|i| (format!("p{}", i), i)).collect();
    let ann_refs: Vec<(&str, u32)> = ann.iter().map(|(id, r)| (id.as_str(), *r)).collect();
    let present: Vec<&str> = ann_refs
        .iter()
        .map(|(id, _)| *id)
        .filter(|id| *id != "p3" && *id != "p7")
        .collect();

    let store = FakeStore::new(lane(&ann_refs), vec![], &present);
    let engine = engine(store, FakeEmbedder::ok());

    let response = engine.search(&SearchRequest::new("anything")).await.unwrap();

    assert_eq!(response.total_found, 8);
    let ids: Vec<&str> = response.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p4", "p5", "p6", "p8", "p9", "p10"]);
}

#[tokio::test]
async fn min_score_bounds_every_result() {
    let store = FakeStore::new(
        lane(&[("A", 1), ("B", 2), ("C", 3)]),
        lane(&[("A", 1)]),
        &["A", "B", "C"],
    );
    let engine = engine(store, FakeEmbedder::ok());

    let mut request = SearchRequest::new("red shoes");
    request.min_score = Some(0.02);
    let response = engine.search(&request).await.unwrap();

    assert!(!response.results.is_empty());
    for result in &response.results {
        assert!(result.score[HYBRID_SCORE_KEY] >= 0.02);
    }
    // Only A accumulates two lane terms above the cutoff.
    assert_eq!(response.results[0].id, "A");
}

#[tokio::test]
async fn empty_lanes_give_empty_response_without_hydration() {
    let store = Arc::new(FakeStore::new(vec![], vec![], &[]));
    let engine = engine_with(store.clone(), Arc::new(FakeEmbedder::ok()));

    let response = engine.search(&SearchRequest::new("nothing matches")).await.unwrap();

    assert_eq!(response.total_found, 0);
    assert!(response.results.is_empty());
    assert_eq!(store.hydrate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn limit_zero_is_valid_and_empty() {
    let store = FakeStore::new(lane(&[("A", 1)]), vec![], &["A"]);
    let engine = engine(store, FakeEmbedder::ok());

    let mut request = SearchRequest::new("red shoes");
    request.limit = Some(0);
    let response = engine.search(&request).await.unwrap();

    assert_eq!(response.total_found, 0);
}

#[tokio::test]
async fn limit_over_maximum_rejected() {
    let store = FakeStore::new(vec![], vec![], &[]);
    let engine = engine(store, FakeEmbedder::ok());

    let mut request = SearchRequest::new("red shoes");
    request.limit = Some(10_000);
    let err = engine.search(&request).await.unwrap_err();

    assert!(matches!(err, SearchError::InvalidRequest { .. }));
}

#[tokio::test]
async fn invalid_min_score_rejected() {
    let store = Arc::new(FakeStore::new(vec![], vec![], &[]));
    let embedder = Arc::new(FakeEmbedder::ok());
    let engine = engine_with(store, embedder.clone());

    let mut request = SearchRequest::new("red shoes");
    request.min_score = Some(-1.0);
    assert!(engine.search(&request).await.is_err());

    request.min_score = Some(f64::NAN);
    assert!(engine.search(&request).await.is_err());

    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn alpha_validated_but_not_consumed() {
    let store = FakeStore::new(lane(&[("A", 1)]), vec![], &["A"]);
    let engine = engine(store, FakeEmbedder::ok());

    let mut request = SearchRequest::new("red shoes");
    request.alpha = Some(2.0);
    assert!(engine.search(&request).await.is_err());

    // A valid alpha changes nothing about the ranking.
    request.alpha = Some(0.5);
    let with_alpha = engine.search(&request).await.unwrap();
    request.alpha = None;
    let without_alpha = engine.search(&request).await.unwrap();

    assert_eq!(
        with_alpha.results[0].score[HYBRID_SCORE_KEY],
        without_alpha.results[0].score[HYBRID_SCORE_KEY]
    );
}

#[tokio::test]
async fn single_lane_degrades_gracefully() {
    // Lexical lane legitimately empty: fusion falls back to ANN order.
    let store = FakeStore::new(lane(&[("A", 1), ("B", 2)]), vec![], &["A", "B"]);
    let engine = engine(store, FakeEmbedder::ok());

    let response = engine.search(&SearchRequest::new("red shoes")).await.unwrap();

    let ids: Vec<&str> = response.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
}

#[tokio::test]
async fn hydration_is_one_batched_call() {
    let store = Arc::new(FakeStore::new(
        lane(&[("A", 1), ("B", 2), ("C", 3)]),
        lane(&[("D", 1)]),
        &["A", "B", "C", "D"],
    ));
    let engine = engine_with(store.clone(), Arc::new(FakeEmbedder::ok()));

    engine.search(&SearchRequest::new("red shoes")).await.unwrap();

    assert_eq!(store.hydrate_calls.load(Ordering::SeqCst), 1);
}

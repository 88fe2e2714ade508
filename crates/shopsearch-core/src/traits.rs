//! Core traits defining the interfaces between pipeline components.
//!
//! Both collaborators are dependency-injected into the engine so tests can
//! substitute fakes without touching shared process state.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::types::{Candidate, Product};

/// Remote embedding model: free text in, fixed-dimension vector out.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single query text.
    ///
    /// Returns a vector of exactly `dimension()` values. A short or absent
    /// response is an error, never a degenerate zero-vector fallback.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// The model's fixed embedding dimension D.
    fn dimension(&self) -> usize;
}

/// Product store exposing the two retrieval primitives plus batched lookup.
///
/// The index implementations behind these calls are external concerns; this
/// trait is the seam the engine retrieves and hydrates through.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Top-K product IDs by ascending vector distance against records with
    /// a non-null embedding. Ranks in the output are 1-based.
    async fn ann_search(&self, embedding: &[f32], k: u32) -> Result<Vec<Candidate>>;

    /// Top-K product IDs by descending text relevance against the indexed
    /// title field. Ranks in the output are 1-based. An empty match set is
    /// a valid empty lane, not an error.
    async fn lexical_search(&self, query: &str, k: u32) -> Result<Vec<Candidate>>;

    /// Materialize full records for the given IDs in one batched round
    /// trip. IDs with no backing record are silently absent from the map.
    async fn hydrate(&self, ids: &[String]) -> Result<HashMap<String, Product>>;

    /// Insert or replace a batch of products (catalog loading seam; the
    /// search pipeline itself never mutates records).
    async fn upsert_products(&self, products: &[Product]) -> Result<()>;

    /// Number of products in the store.
    async fn count_products(&self) -> Result<u64>;
}

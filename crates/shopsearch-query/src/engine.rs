//! Hybrid search engine: the per-request pipeline from query text to
//! assembled response.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use shopsearch_core::{
    Embedder, ProductStore, Result, SearchConfig, SearchError, SearchRequest, SearchResponse,
};

use crate::assemble::assemble;
use crate::fusion::reciprocal_rank_fusion;

/// Hybrid search engine.
///
/// Embeds the query, issues the ANN and lexical lanes in parallel, fuses
/// the ranked lists with RRF, batch-hydrates the winners, and assembles
/// the response. All state is request-local; the shared handles are only
/// the embedder and store connections, both safe for concurrent use.
pub struct SearchEngine<S, E> {
    store: Arc<S>,
    embedder: Arc<E>,
    config: SearchConfig,
}

impl<S, E> SearchEngine<S, E>
where
    S: ProductStore,
    E: Embedder,
{
    /// Create a new engine over the given collaborators.
    pub fn new(store: Arc<S>, embedder: Arc<E>, config: SearchConfig) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Serve one search request.
    ///
    /// Any embedding or lane failure aborts the whole request: an
    /// incomplete hybrid score would silently bias rankings, so there is
    /// no partial-credit response. Per-ID hydration loss only shrinks the
    /// result set.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let start = Instant::now();

        // Request validation happens before any remote call.
        let query = request.query.trim();
        if query.is_empty() {
            return Err(SearchError::invalid_request("query must not be empty"));
        }

        let limit = request.limit.unwrap_or(self.config.default_limit);
        if limit > self.config.max_limit {
            return Err(SearchError::invalid_request(format!(
                "limit {} exceeds maximum {}",
                limit, self.config.max_limit
            )));
        }

        let min_score = request.min_score.unwrap_or(self.config.default_min_score);
        if !min_score.is_finite() || min_score < 0.0 {
            return Err(SearchError::invalid_request(format!(
                "min_score must be a non-negative finite number, got {}",
                min_score
            )));
        }

        // alpha is accepted and validated but reserved: the RRF rule has
        // no term that consumes it.
        if let Some(alpha) = request.alpha {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(SearchError::invalid_request(format!(
                    "alpha must be within 0..=1, got {}",
                    alpha
                )));
            }
        }

        info!("Searching for: {:?}", query);

        let query_vector = self.embedder.embed_query(query).await?;

        // Both lanes share K, kept >= limit since fused IDs are a subset
        // of the union of both lanes.
        let k = self.config.candidate_pool.max(limit) as u32;

        // No data dependency between the lanes; issue them in parallel
        // and wait for both. A failure in either fails the combined call.
        let (ann, lexical) = tokio::join!(
            self.store.ann_search(&query_vector, k),
            self.store.lexical_search(query, k)
        );
        let ann = ann?;
        let lexical = lexical?;

        debug!(
            "ANN lane returned {} candidates, lexical lane returned {}",
            ann.len(),
            lexical.len()
        );

        let fused = reciprocal_rank_fusion(&ann, &lexical, self.config.rrf_k, limit);

        if fused.is_empty() {
            return Ok(SearchResponse {
                results: Vec::new(),
                total_found: 0,
            });
        }

        let ids: Vec<String> = fused.iter().map(|f| f.id.clone()).collect();
        let hydrated = self.store.hydrate(&ids).await?;

        if hydrated.len() < ids.len() {
            debug!(
                "Hydration returned {} of {} requested records",
                hydrated.len(),
                ids.len()
            );
        }

        let results = assemble(&fused, &hydrated, min_score);

        info!(
            "Search completed in {}ms, returned {} results",
            start.elapsed().as_millis(),
            results.len()
        );

        Ok(SearchResponse {
            total_found: results.len(),
            results,
        })
    }
}

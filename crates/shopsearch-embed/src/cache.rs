//! Query embedding cache.
//!
//! Keys are exact query texts, values are embedding vectors. Bounded
//! capacity with a TTL, so repeated queries skip the remote call for a
//! while without the cache ever masking a failure: errors propagate and
//! nothing is inserted for them.

use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use tracing::debug;

use shopsearch_core::{Embedder, Result};

/// Caching wrapper around any [`Embedder`].
pub struct CachedEmbedder<E> {
    inner: E,
    cache: Cache<String, Vec<f32>>,
}

impl<E: Embedder> CachedEmbedder<E> {
    /// Wrap an embedder with a bounded, TTL-evicting cache.
    pub fn new(inner: E, max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { inner, cache }
    }

    /// Number of cached queries.
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CachedEmbedder<E> {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.cache.get(text) {
            debug!("Embedding cache hit ({} chars)", text.len());
            return Ok(vector);
        }

        let vector = self.inner.embed_query(text).await?;
        self.cache.insert(text.to_string(), vector.clone());
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEmbedder;
    use shopsearch_core::SearchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder that counts calls and optionally always fails.
    struct CountingEmbedder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingEmbedder {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SearchError::EmbeddingTimeout { elapsed_ms: 1 });
            }
            MockEmbedder::with_dimension(8).embed_query(text).await
        }

        fn dimension(&self) -> usize {
            8
        }
    }

    #[tokio::test]
    async fn test_repeated_query_hits_cache() {
        let embedder = CachedEmbedder::new(
            CountingEmbedder::new(false),
            100,
            Duration::from_secs(60),
        );

        let first = embedder.embed_query("red shoes").await.unwrap();
        let second = embedder.embed_query("red shoes").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(embedder.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_queries_miss() {
        let embedder = CachedEmbedder::new(
            CountingEmbedder::new(false),
            100,
            Duration::from_secs(60),
        );

        embedder.embed_query("red shoes").await.unwrap();
        embedder.embed_query("blue shoes").await.unwrap();

        assert_eq!(embedder.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let embedder = CachedEmbedder::new(
            CountingEmbedder::new(true),
            100,
            Duration::from_secs(60),
        );

        assert!(embedder.embed_query("q").await.is_err());
        assert!(embedder.embed_query("q").await.is_err());

        // Both attempts reached the inner embedder; the error was never
        // served from cache.
        assert_eq!(embedder.inner.calls.load(Ordering::SeqCst), 2);
        assert!(embedder.is_empty());
    }
}

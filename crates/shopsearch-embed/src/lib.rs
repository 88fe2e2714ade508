//! shopsearch-embed - Remote embedding client
//!
//! This crate converts free text into fixed-dimension dense vectors via a
//! remote prediction endpoint, with a bounded TTL cache for repeated
//! queries and a deterministic mock for tests and offline use.

mod cache;
mod mock;
mod remote;

pub use cache::CachedEmbedder;
pub use mock::MockEmbedder;
pub use remote::RemoteEmbedder;

// Re-export the Embedder trait for convenience
pub use shopsearch_core::Embedder;

//! shopsearch-query - Rank fusion and search engine
//!
//! This crate turns a free-text query into a ranked list of hydrated
//! product records: ANN and lexical retrieval in parallel, Reciprocal
//! Rank Fusion over the two ranked lists, one batched hydration pass,
//! and defensive response assembly.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopsearch_query::SearchEngine;
//! use shopsearch_core::{SearchConfig, SearchRequest};
//! use std::sync::Arc;
//!
//! let engine = SearchEngine::new(Arc::new(store), Arc::new(embedder), SearchConfig::default());
//! let response = engine.search(&SearchRequest::new("red shoes")).await?;
//! ```

mod assemble;
mod engine;
mod fusion;

pub use assemble::{assemble, attributes, images, price_info, string_field, string_list};
pub use engine::SearchEngine;
pub use fusion::{reciprocal_rank_fusion, DEFAULT_RRF_K};

// Re-export for convenience
pub use shopsearch_core::{SearchRequest, SearchResponse, SearchResult};

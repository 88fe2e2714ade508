//! shopsearch-store - SQLite catalog storage
//!
//! This crate provides persistent storage for product records with two
//! retrieval primitives over a shared corpus: top-K by vector distance
//! (sqlite-vec) and top-K by lexical relevance (FTS5 over titles), plus
//! batched hydration by ID.

mod schema;
mod sqlite;

pub use sqlite::SqliteProductStore;

// Re-export schema for testing/migrations
pub use schema::{vec_schema, SCHEMA, SCHEMA_VERSION};

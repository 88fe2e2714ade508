//! shopsearch-core - Core types and traits for the hybrid search engine
//!
//! This crate provides the foundational types, traits, configuration, and
//! error handling used throughout the shopsearch workspace.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{Lane, Result, SearchError};
pub use traits::*;
pub use types::*;

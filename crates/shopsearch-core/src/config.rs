//! Configuration types for the search service.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default RRF smoothing constant (commonly 60).
/// Higher values dampen the influence of rank-1 dominance.
pub const DEFAULT_RRF_K: u32 = 60;

/// Main configuration for the search service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopSearchConfig {
    /// Embedding endpoint configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Search pipeline configuration.
    #[serde(default)]
    pub search: SearchConfig,
}

/// Remote embedding endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Prediction endpoint URL. Empty means no remote endpoint is
    /// configured (the CLI falls back to the mock embedder).
    #[serde(default)]
    pub endpoint: String,

    /// Environment variable holding the bearer token.
    #[serde(default = "default_auth_token_env")]
    pub auth_token_env: String,

    /// Embedding dimension D the model produces.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Per-call timeout in milliseconds.
    #[serde(default = "default_embed_timeout")]
    pub timeout_ms: u64,

    /// Task type sent alongside the query text.
    #[serde(default = "default_task_type")]
    pub task_type: String,

    /// Cache embeddings keyed by exact query text.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Maximum cached queries.
    #[serde(default = "default_cache_entries")]
    pub cache_max_entries: u64,

    /// Cache entry TTL in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            auth_token_env: default_auth_token_env(),
            dimension: default_dimension(),
            timeout_ms: default_embed_timeout(),
            task_type: default_task_type(),
            cache_enabled: true,
            cache_max_entries: default_cache_entries(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite catalog file.
    pub path: PathBuf,

    /// SQLite cache size (negative = KB, positive = pages).
    #[serde(default = "default_cache_size")]
    pub cache_size: i32,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            cache_size: -64000, // 64MB
            busy_timeout_ms: 30000,
        }
    }
}

/// Search pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default result limit when the request omits one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Maximum result limit a request may ask for.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Per-lane candidate pool size K before fusion. The effective K is
    /// max(candidate_pool, limit), so K is always >= the requested limit.
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,

    /// RRF smoothing constant k. Dampens rank-1 dominance.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,

    /// Default minimum fused score when the request omits one.
    #[serde(default)]
    pub default_min_score: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            candidate_pool: 50,
            rrf_k: 60,
            default_min_score: 0.0,
        }
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_auth_token_env() -> String {
    "SHOPSEARCH_EMBED_TOKEN".to_string()
}

fn default_dimension() -> usize {
    768
}

fn default_embed_timeout() -> u64 {
    5000
}

fn default_task_type() -> String {
    "RETRIEVAL_QUERY".to_string()
}

fn default_cache_entries() -> u64 {
    10_000
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_size() -> i32 {
    -64000
}

fn default_busy_timeout() -> u32 {
    30000
}

fn default_limit() -> usize {
    10
}

fn default_max_limit() -> usize {
    100
}

fn default_candidate_pool() -> usize {
    50
}

fn default_rrf_k() -> u32 {
    DEFAULT_RRF_K
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shopsearch")
        .join("catalog.db")
}

impl ShopSearchConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::SearchError::config(format!("Failed to parse config: {}", e))
        })?;
        Ok(config)
    }

    /// Load configuration from default paths: user config dir, then a
    /// local `shopsearch.toml`, then built-in defaults.
    pub fn load_default() -> crate::error::Result<Self> {
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("shopsearch").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        let local_config = PathBuf::from("shopsearch.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShopSearchConfig::default();
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.search.rrf_k, 60);
        assert_eq!(config.search.candidate_pool, 50);
        assert_eq!(config.embedding.dimension, 768);
    }

    #[test]
    fn test_rrf_k_default_tracks_named_constant() {
        assert_eq!(SearchConfig::default().rrf_k, DEFAULT_RRF_K);
    }

    #[test]
    fn test_pool_at_least_default_limit() {
        let config = SearchConfig::default();
        assert!(config.candidate_pool >= config.default_limit);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: ShopSearchConfig = toml::from_str(
            r#"
            [search]
            default_limit = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.search.default_limit, 25);
        // Untouched sections keep their defaults.
        assert_eq!(config.search.rrf_k, 60);
        assert_eq!(config.embedding.timeout_ms, 5000);
    }
}

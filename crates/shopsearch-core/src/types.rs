//! Core domain types for the hybrid search engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Score key under which the fused RRF score is reported.
///
/// Named so callers can distinguish the fusion score from any future
/// per-lane scores added alongside it.
pub const HYBRID_SCORE_KEY: &str = "hybrid";

/// A product record as stored in the catalog.
///
/// The structured payload is opaque to the fusion logic; only the
/// response assembler reads display fields out of it, defensively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier (assigned by the external catalog).
    pub id: String,

    /// Short display title, also the lexically indexed field.
    pub title: String,

    /// Dense embedding of fixed dimension D. Products without an
    /// embedding are excluded from the ANN lane by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Opaque structured payload: name, brand, category, price, images,
    /// attributes, availability, and so on.
    #[serde(default)]
    pub product_data: serde_json::Value,
}

impl Product {
    /// Create a product with no embedding and an empty payload.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            embedding: None,
            product_data: serde_json::Value::Null,
        }
    }
}

/// One entry in a single lane's ranked output: an ID at a 1-based rank.
///
/// Ranks, not raw distances or relevance scores, are the unit of exchange
/// between lanes; lexical scores and vector distances live on unrelated
/// scales and are never compared directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Product identifier.
    pub id: String,

    /// 1-based position in the lane's ordering.
    pub rank: u32,
}

impl Candidate {
    /// Create a candidate at the given 1-based rank.
    pub fn new(id: impl Into<String>, rank: u32) -> Self {
        Self { id: id.into(), rank }
    }
}

/// A fused result: ID, accumulated RRF score, and per-lane provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    /// Product identifier.
    pub id: String,

    /// Accumulated reciprocal-rank score across lanes.
    pub score: f64,

    /// Rank in the ANN lane, if the ID appeared there.
    pub ann_rank: Option<u32>,

    /// Rank in the lexical lane, if the ID appeared there.
    pub lexical_rank: Option<u32>,
}

/// An incoming search request.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    /// Free-text query. Required, non-empty.
    pub query: String,

    /// Maximum results to return. Defaults from configuration.
    #[serde(default)]
    pub limit: Option<usize>,

    /// Minimum fused score; results below it are filtered out.
    /// Defaults to 0 (no filtering).
    #[serde(default)]
    pub min_score: Option<f64>,

    /// Hybrid-weighting knob, 0..=1. Accepted and validated but reserved:
    /// the RRF fusion rule has no term that consumes it.
    #[serde(default)]
    pub alpha: Option<f32>,
}

impl SearchRequest {
    /// Create a request with only a query, all knobs defaulted.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: None,
            min_score: None,
            alpha: None,
        }
    }
}

/// Price information extracted from the product payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceInfo {
    #[serde(default)]
    pub cost: f64,

    #[serde(default)]
    pub currency_code: String,

    #[serde(default)]
    pub original_price: f64,

    #[serde(default)]
    pub price: f64,
}

/// A product image reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub height: i64,

    #[serde(default)]
    pub width: i64,

    #[serde(default)]
    pub uri: String,
}

/// A typed attribute value: text values, numeric values, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    #[serde(default)]
    pub text: Vec<String>,

    #[serde(default)]
    pub numbers: Vec<f64>,
}

/// A keyed product attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: AttributeValue,
}

/// One externally visible search result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,

    pub name: String,

    pub title: String,

    pub brands: Vec<String>,

    pub categories: Vec<String>,

    pub price_info: PriceInfo,

    pub availability: String,

    pub images: Vec<Image>,

    pub sizes: Vec<String>,

    pub attributes: Vec<Attribute>,

    pub uri: String,

    /// Scores keyed by lane name; fused score lives under
    /// [`HYBRID_SCORE_KEY`].
    pub score: HashMap<String, f64>,
}

/// Search response container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,

    pub total_found: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: SearchRequest = serde_json::from_str(r#"{"query": "red shoes"}"#).unwrap();
        assert_eq!(req.query, "red shoes");
        assert!(req.limit.is_none());
        assert!(req.min_score.is_none());
        assert!(req.alpha.is_none());
    }

    #[test]
    fn test_request_accepts_alpha() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"query": "q", "limit": 5, "alpha": 0.3}"#).unwrap();
        assert_eq!(req.limit, Some(5));
        assert_eq!(req.alpha, Some(0.3));
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = SearchResult {
            id: "p1".to_string(),
            price_info: PriceInfo {
                currency_code: "USD".to_string(),
                price: 9.99,
                ..Default::default()
            },
            ..Default::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["priceInfo"]["currencyCode"], "USD");
        assert_eq!(json["priceInfo"]["price"], 9.99);
    }

    #[test]
    fn test_product_payload_roundtrip() {
        let product = Product {
            id: "p1".to_string(),
            title: "Blue Jacket".to_string(),
            embedding: Some(vec![0.1, 0.2]),
            product_data: serde_json::json!({"brands": ["Acme"]}),
        };
        let json = serde_json::to_string(&product).unwrap();
        let back: Product = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "p1");
        assert_eq!(back.product_data["brands"][0], "Acme");
    }
}

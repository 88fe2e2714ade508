//! Response assembly: hydrated records plus score metadata in, externally
//! visible results out.
//!
//! Display fields are extracted from the opaque `product_data` payload by
//! small pure accessors, each returning a default on any shape mismatch.
//! An absent or partial payload never fails a request.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use shopsearch_core::{
    Attribute, AttributeValue, FusedResult, Image, PriceInfo, Product, SearchResult,
    HYBRID_SCORE_KEY,
};

/// Map fused results to the response shape.
///
/// Results whose fused score falls below `min_score` are filtered out, as
/// are results with no hydrated record (deleted after indexing, or lagging
/// behind the index). Fusion order is preserved exactly; no re-sorting.
pub fn assemble(
    fused: &[FusedResult],
    hydrated: &HashMap<String, Product>,
    min_score: f64,
) -> Vec<SearchResult> {
    let mut results = Vec::with_capacity(fused.len());

    for item in fused {
        if item.score < min_score {
            continue;
        }

        let Some(product) = hydrated.get(&item.id) else {
            debug!("Dropping candidate {} with no hydrated record", item.id);
            continue;
        };

        let data = &product.product_data;
        let mut score = HashMap::with_capacity(1);
        score.insert(HYBRID_SCORE_KEY.to_string(), item.score);

        results.push(SearchResult {
            id: product.id.clone(),
            name: string_field(data, "name"),
            title: product.title.clone(),
            brands: string_list(data, "brands"),
            categories: string_list(data, "categories"),
            price_info: price_info(data),
            availability: string_field(data, "availability"),
            images: images(data),
            sizes: string_list(data, "sizes"),
            attributes: attributes(data),
            uri: string_field(data, "uri"),
            score,
        });
    }

    results
}

/// Extract a string field, empty on absence or type mismatch.
pub fn string_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Extract a list of strings, skipping non-string elements.
pub fn string_list(data: &Value, key: &str) -> Vec<String> {
    data.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Extract price information field by field, defaulting each on mismatch.
pub fn price_info(data: &Value) -> PriceInfo {
    let Some(info) = data.get("priceInfo") else {
        return PriceInfo::default();
    };

    PriceInfo {
        cost: f64_field(info, "cost"),
        currency_code: string_field(info, "currencyCode"),
        original_price: f64_field(info, "originalPrice"),
        price: f64_field(info, "price"),
    }
}

/// Extract image references; malformed entries yield defaulted fields.
pub fn images(data: &Value) -> Vec<Image> {
    data.get("images")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| Image {
                    height: item.get("height").and_then(Value::as_i64).unwrap_or_default(),
                    width: item.get("width").and_then(Value::as_i64).unwrap_or_default(),
                    uri: string_field(item, "uri"),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Extract attributes from the payload's key -> {text, numbers} map,
/// sorted by key for deterministic output.
pub fn attributes(data: &Value) -> Vec<Attribute> {
    let Some(map) = data.get("attributes").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut attrs: Vec<Attribute> = map
        .iter()
        .map(|(key, value)| Attribute {
            key: key.clone(),
            value: AttributeValue {
                text: string_list_direct(value, "text"),
                numbers: value
                    .get("numbers")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(Value::as_f64).collect())
                    .unwrap_or_default(),
            },
        })
        .collect();

    attrs.sort_by(|a, b| a.key.cmp(&b.key));
    attrs
}

fn f64_field(data: &Value, key: &str) -> f64 {
    data.get(key).and_then(Value::as_f64).unwrap_or_default()
}

fn string_list_direct(data: &Value, key: &str) -> Vec<String> {
    string_list(data, key)
}

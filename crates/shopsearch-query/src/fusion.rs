//! Reciprocal Rank Fusion (RRF) for merging the two retrieval lanes.

use std::collections::HashMap;

use shopsearch_core::{Candidate, FusedResult};

pub use shopsearch_core::config::DEFAULT_RRF_K;

/// Fuse the ANN and lexical lanes using Reciprocal Rank Fusion.
///
/// RRF score = Σ over lanes in which the ID appears of `1 / (k + rank)`.
/// An ID present in only one lane still scores using that lane's term; an
/// ID absent from a lane contributes 0 for it. Rank-based, not raw-score
/// based: lexical relevance and vector distance live on unrelated scales.
///
/// Pure function, no I/O. Output is sorted by fused score descending with
/// a stable tie-break by ID, truncated to `limit`. Duplicate IDs within a
/// single lane violate the retriever contract and are defended against by
/// keeping the first occurrence.
pub fn reciprocal_rank_fusion(
    ann: &[Candidate],
    lexical: &[Candidate],
    k: u32,
    limit: usize,
) -> Vec<FusedResult> {
    let mut fused: HashMap<&str, FusedResult> = HashMap::new();

    for candidate in ann {
        let entry = fused
            .entry(candidate.id.as_str())
            .or_insert_with(|| FusedResult {
                id: candidate.id.clone(),
                score: 0.0,
                ann_rank: None,
                lexical_rank: None,
            });
        if entry.ann_rank.is_none() {
            entry.ann_rank = Some(candidate.rank);
            entry.score += 1.0 / (f64::from(k) + f64::from(candidate.rank));
        }
    }

    for candidate in lexical {
        let entry = fused
            .entry(candidate.id.as_str())
            .or_insert_with(|| FusedResult {
                id: candidate.id.clone(),
                score: 0.0,
                ann_rank: None,
                lexical_rank: None,
            });
        if entry.lexical_rank.is_none() {
            entry.lexical_rank = Some(candidate.rank);
            entry.score += 1.0 / (f64::from(k) + f64::from(candidate.rank));
        }
    }

    let mut results: Vec<FusedResult> = fused.into_values().collect();
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    results.truncate(limit);

    results
}

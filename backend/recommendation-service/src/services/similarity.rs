//! Content similarity over the trained vector space.
//!
//! Rows are L2-normalized, so cosine similarity is the dot product. Results
//! are ordered by score descending, ties by corpus position ascending, and
//! never contain the query product, including rows repeating its id.

use super::model::TrainedModel;
use crate::models::Recommendation;
use std::cmp::Ordering;

/// Neighbors of the product at `position` as (position, score) pairs.
pub fn neighbors(model: &TrainedModel, position: usize, limit: usize) -> Vec<(usize, f64)> {
    let (Some(query), Some(query_entry)) = (model.vector(position), model.entry(position)) else {
        return Vec::new();
    };

    let mut scored: Vec<(usize, f64)> = model
        .vectors()
        .iter()
        .enumerate()
        .filter(|(idx, _)| {
            *idx != position
                && model
                    .entry(*idx)
                    .map_or(false, |entry| entry.id != query_entry.id)
        })
        .map(|(idx, row)| (idx, query.dot(row)))
        .collect();

    scored.sort_by(rank_order);
    scored.truncate(limit);
    scored
}

/// Top `limit` products similar to `product_id`. Unknown ids yield an empty list.
pub fn similar_to(model: &TrainedModel, product_id: &str, limit: usize) -> Vec<Recommendation> {
    let Some(position) = model.position_of(product_id) else {
        return Vec::new();
    };

    neighbors(model, position, limit)
        .into_iter()
        .filter_map(|(idx, score)| {
            model
                .entry(idx)
                .map(|entry| Recommendation::from_entry(entry, score))
        })
        .collect()
}

/// Similarity between two products by id, None if either is unknown.
pub fn pair_similarity(model: &TrainedModel, a: &str, b: &str) -> Option<f64> {
    let va = model.vector(model.position_of(a)?)?;
    let vb = model.vector(model.position_of(b)?)?;
    Some(va.dot(vb))
}

/// Score descending, then position ascending. NaN sorts as equal.
pub(crate) fn rank_order(a: &(usize, f64), b: &(usize, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

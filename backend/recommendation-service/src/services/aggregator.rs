//! Personalized aggregation
//!
//! Algorithm:
//! 1. Deduplicate the customer's purchases followed by views, keeping first
//!    occurrence order
//! 2. For the first `seed_interactions` of them, take the top
//!    `neighbors_per_seed` similar products
//! 3. Weight each neighbor score by `purchase_boost` if the seed was
//!    purchased, `view_weight` otherwise, and sum per product
//! 4. Drop every product the customer already interacted with
//! 5. Rank by accumulated score (ties by corpus position) and take `limit`

use super::model::TrainedModel;
use super::similarity::{neighbors, rank_order};
use crate::config::RecommendationConfig;
use crate::models::{InteractionRecord, Recommendation};
use std::collections::{HashMap, HashSet};

/// Deduplicated interactions in deterministic order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionSet {
    ordered: Vec<String>,
    purchased: HashSet<String>,
}

impl InteractionSet {
    pub fn from_record(record: &InteractionRecord) -> Self {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut ordered = Vec::new();
        for id in record.purchased.iter().chain(record.viewed.iter()) {
            if seen.insert(id.as_str()) {
                ordered.push(id.clone());
            }
        }

        Self {
            ordered,
            purchased: record.purchased.iter().cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn was_purchased(&self, product_id: &str) -> bool {
        self.purchased.contains(product_id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ordered
    }
}

pub fn aggregate(
    model: &TrainedModel,
    interactions: &InteractionSet,
    config: &RecommendationConfig,
    limit: usize,
) -> Vec<Recommendation> {
    // product id -> (accumulated score, corpus position)
    let mut accumulated: HashMap<&str, (f64, usize)> = HashMap::new();

    for seed in interactions.ids().iter().take(config.seed_interactions) {
        let Some(position) = model.position_of(seed) else {
            continue;
        };
        let weight = if interactions.was_purchased(seed) {
            config.purchase_boost
        } else {
            config.view_weight
        };

        for (neighbor, score) in neighbors(model, position, config.neighbors_per_seed) {
            let Some(entry) = model.entry(neighbor) else {
                continue;
            };
            let slot = accumulated
                .entry(entry.id.as_str())
                .or_insert((0.0, neighbor));
            slot.0 += score * weight;
        }
    }

    let excluded: HashSet<&str> = interactions.ids().iter().map(String::as_str).collect();
    let mut ranked: Vec<(usize, f64)> = accumulated
        .into_iter()
        .filter(|(id, _)| !excluded.contains(id))
        .map(|(_, (score, position))| (position, score))
        .collect();

    ranked.sort_by(rank_order);
    ranked.truncate(limit);

    ranked
        .into_iter()
        .filter_map(|(position, score)| {
            model
                .entry(position)
                .map(|entry| Recommendation::from_entry(entry, score))
        })
        .collect()
}

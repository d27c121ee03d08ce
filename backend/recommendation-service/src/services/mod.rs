//! Recommendation core
//!
//! Pipeline: product text -> TF-IDF rows -> cosine neighbors -> weighted
//! aggregation over a customer's history, with popularity as the baseline.

pub mod aggregator;
pub mod engine;
pub mod featurizer;
pub mod model;
pub mod model_slot;
pub mod popularity;
pub mod similarity;
pub mod snapshot;
pub mod tfidf;

pub use aggregator::{aggregate, InteractionSet};
pub use engine::RecommendationEngine;
pub use featurizer::combined_text;
pub use model::TrainedModel;
pub use model_slot::ModelSlot;
pub use snapshot::SnapshotStore;
pub use tfidf::{SparseVector, TfidfVectorizer};

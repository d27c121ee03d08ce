//! Trained model: vectorizer, one row per product, and the product table,
//! always built and replaced together.

use super::featurizer::combined_text;
use super::tfidf::{SparseVector, TfidfVectorizer, VectorizerError};
use crate::config::VectorizerConfig;
use crate::error::EngineError;
use crate::models::{CatalogEntry, Product};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug)]
pub struct TrainedModel {
    pub(crate) generation: Uuid,
    pub(crate) trained_at: DateTime<Utc>,
    pub(crate) vectorizer: TfidfVectorizer,
    pub(crate) vectors: Vec<SparseVector>,
    pub(crate) catalog: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl TrainedModel {
    /// Fit a fresh model on `products`, preserving their order.
    ///
    /// CPU-bound; async callers run it on the blocking pool.
    pub fn train(products: &[Product], config: VectorizerConfig) -> Result<Self, EngineError> {
        if products.is_empty() {
            return Err(EngineError::EmptyCorpus);
        }

        let documents: Vec<String> = products.iter().map(combined_text).collect();
        let (vectorizer, vectors) =
            TfidfVectorizer::fit_transform(&documents, config).map_err(|e| match e {
                VectorizerError::EmptyCorpus => EngineError::EmptyCorpus,
                VectorizerError::EmptyVocabulary => EngineError::EmptyVocabulary,
                VectorizerError::InvalidState(msg) => EngineError::Internal(msg),
            })?;
        let catalog = products.iter().map(CatalogEntry::from).collect();

        Self::from_parts(Uuid::new_v4(), Utc::now(), vectorizer, vectors, catalog)
    }

    /// Assemble a model from its three parts, checking they belong together.
    pub fn from_parts(
        generation: Uuid,
        trained_at: DateTime<Utc>,
        vectorizer: TfidfVectorizer,
        vectors: Vec<SparseVector>,
        catalog: Vec<CatalogEntry>,
    ) -> Result<Self, EngineError> {
        if vectors.len() != catalog.len() {
            return Err(EngineError::CorruptSnapshot(format!(
                "{} vectors for {} products",
                vectors.len(),
                catalog.len()
            )));
        }

        let dims = vectorizer.vocabulary_size();
        if let Some(bad) = vectors
            .iter()
            .position(|v| !v.is_well_formed() || v.min_dimension() > dims)
        {
            return Err(EngineError::CorruptSnapshot(format!(
                "vector {bad} does not fit a vocabulary of {dims} terms"
            )));
        }

        // First occurrence wins if the corpus repeats an id
        let mut index = HashMap::with_capacity(catalog.len());
        for (position, entry) in catalog.iter().enumerate() {
            index.entry(entry.id.clone()).or_insert(position);
        }

        Ok(Self {
            generation,
            trained_at,
            vectorizer,
            vectors,
            catalog,
            index,
        })
    }

    pub fn generation(&self) -> Uuid {
        self.generation
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn product_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.vocabulary_size()
    }

    pub fn position_of(&self, product_id: &str) -> Option<usize> {
        self.index.get(product_id).copied()
    }

    pub fn entry(&self, position: usize) -> Option<&CatalogEntry> {
        self.catalog.get(position)
    }

    pub fn vector(&self, position: usize) -> Option<&SparseVector> {
        self.vectors.get(position)
    }

    pub fn vectors(&self) -> &[SparseVector] {
        &self.vectors
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Product> {
        vec![
            Product::new("a", "red running shoes", ""),
            Product::new("b", "blue running shoes", ""),
            Product::new("c", "office chair", ""),
        ]
    }

    #[test]
    fn test_train_preserves_corpus_order() {
        let model = TrainedModel::train(&corpus(), VectorizerConfig::default()).unwrap();
        assert_eq!(model.product_count(), 3);
        assert_eq!(model.position_of("a"), Some(0));
        assert_eq!(model.position_of("c"), Some(2));
        assert_eq!(model.entry(1).map(|e| e.name.as_str()), Some("blue running shoes"));
        assert!(model.position_of("zzz").is_none());
    }

    #[test]
    fn test_train_empty_corpus() {
        let err = TrainedModel::train(&[], VectorizerConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyCorpus));
    }

    #[test]
    fn test_duplicate_ids_resolve_to_first() {
        let mut products = corpus();
        products.push(Product::new("a", "duplicate lamp", ""));
        let model = TrainedModel::train(&products, VectorizerConfig::default()).unwrap();
        assert_eq!(model.position_of("a"), Some(0));
        assert_eq!(model.product_count(), 4);
    }

    #[test]
    fn test_from_parts_rejects_misaligned_rows() {
        let model = TrainedModel::train(&corpus(), VectorizerConfig::default()).unwrap();
        let mut catalog = model.catalog.clone();
        catalog.pop();
        let err = TrainedModel::from_parts(
            model.generation,
            model.trained_at,
            model.vectorizer.clone(),
            model.vectors.clone(),
            catalog,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::CorruptSnapshot(_)));
    }
}

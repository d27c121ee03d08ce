//! TF-IDF vectorizer
//!
//! Fit rules:
//! - lowercase, tokens are runs of two or more word characters
//! - English stop words removed before n-grams are formed
//! - n-grams from 1 up to `ngram_max`, joined by a single space
//! - terms below `min_df` documents dropped, then the `max_features` terms
//!   with the highest total count kept (ties broken alphabetically)
//! - columns ordered alphabetically by term
//! - idf = ln((1 + n) / (1 + df)) + 1, tf = raw count, rows L2-normalized
//!
//! Fitting is deterministic: the same documents always yield the same
//! vocabulary, column order, and weights.

use super::sparse::SparseVector;
use super::stopwords::is_stop_word;
use crate::config::VectorizerConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("hardcoded token regex is invalid"));

#[derive(Debug, Error, PartialEq)]
pub enum VectorizerError {
    #[error("cannot fit vectorizer on an empty corpus")]
    EmptyCorpus,

    #[error("empty vocabulary: documents contain only stop words or short tokens")]
    EmptyVocabulary,

    #[error("invalid vectorizer state: {0}")]
    InvalidState(String),
}

/// Persistable form of a fitted vectorizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerState {
    pub config: VectorizerConfig,
    /// Column order: terms[i] is column i
    pub terms: Vec<String>,
    pub idf: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    terms: Vec<String>,
    idf: Vec<f64>,
    vocabulary: HashMap<String, u32>,
}

impl TfidfVectorizer {
    /// Fit on `documents` and return the vectorizer with one row per document,
    /// in input order.
    pub fn fit_transform(
        documents: &[String],
        config: VectorizerConfig,
    ) -> Result<(Self, Vec<SparseVector>), VectorizerError> {
        if documents.is_empty() {
            return Err(VectorizerError::EmptyCorpus);
        }

        let analyzed: Vec<Vec<String>> = documents
            .iter()
            .map(|doc| analyze(doc, config.ngram_max))
            .collect();

        // term -> (total count, document frequency)
        let mut stats: HashMap<&str, (usize, usize)> = HashMap::new();
        for terms in &analyzed {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for term in terms {
                *counts.entry(term.as_str()).or_insert(0) += 1;
            }
            for (term, count) in counts {
                let entry = stats.entry(term).or_insert((0, 0));
                entry.0 += count;
                entry.1 += 1;
            }
        }

        let mut kept: Vec<(&str, usize, usize)> = stats
            .into_iter()
            .filter(|(_, (_, df))| *df >= config.min_df.max(1))
            .map(|(term, (total, df))| (term, total, df))
            .collect();

        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        kept.truncate(config.max_features);
        kept.sort_by(|a, b| a.0.cmp(&b.0));

        if kept.is_empty() {
            return Err(VectorizerError::EmptyVocabulary);
        }

        let n_docs = documents.len() as f64;
        let terms: Vec<String> = kept.iter().map(|(t, _, _)| t.to_string()).collect();
        let idf: Vec<f64> = kept
            .iter()
            .map(|(_, _, df)| ((1.0 + n_docs) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();

        let vectorizer = Self::from_state(VectorizerState { config, terms, idf })?;
        let rows = analyzed
            .iter()
            .map(|terms| vectorizer.vectorize_terms(terms))
            .collect();

        Ok((vectorizer, rows))
    }

    /// Rebuild from a persisted state, validating its shape.
    pub fn from_state(state: VectorizerState) -> Result<Self, VectorizerError> {
        if state.terms.len() != state.idf.len() {
            return Err(VectorizerError::InvalidState(format!(
                "{} terms but {} idf weights",
                state.terms.len(),
                state.idf.len()
            )));
        }
        if state.terms.len() > u32::MAX as usize {
            return Err(VectorizerError::InvalidState(
                "vocabulary too large".to_string(),
            ));
        }

        let mut vocabulary = HashMap::with_capacity(state.terms.len());
        for (idx, term) in state.terms.iter().enumerate() {
            if vocabulary.insert(term.clone(), idx as u32).is_some() {
                return Err(VectorizerError::InvalidState(format!(
                    "duplicate term {term:?}"
                )));
            }
        }

        Ok(Self {
            config: state.config,
            terms: state.terms,
            idf: state.idf,
            vocabulary,
        })
    }

    pub fn to_state(&self) -> VectorizerState {
        VectorizerState {
            config: self.config,
            terms: self.terms.clone(),
            idf: self.idf.clone(),
        }
    }

    /// Project arbitrary text into the fitted space. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.vectorize_terms(&analyze(text, self.config.ngram_max))
    }

    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    pub fn column(&self, term: &str) -> Option<u32> {
        self.vocabulary.get(term).copied()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    fn vectorize_terms(&self, terms: &[String]) -> SparseVector {
        let pairs = terms
            .iter()
            .filter_map(|term| self.vocabulary.get(term.as_str()))
            .map(|&col| (col, self.idf[col as usize]))
            .collect();

        let mut row = SparseVector::from_pairs(pairs);
        row.l2_normalize();
        row
    }
}

/// Tokenize, drop stop words, then emit n-grams 1..=ngram_max in order.
pub fn analyze(text: &str, ngram_max: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !is_stop_word(t))
        .collect();

    let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    for n in 2..=ngram_max.max(1) {
        if tokens.len() < n {
            break;
        }
        terms.extend(tokens.windows(n).map(|w| w.join(" ")));
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_analyze_unigrams_and_bigrams() {
        let terms = analyze("The Red running-shoes, a b", 2);
        assert_eq!(
            terms,
            vec!["red", "running", "shoes", "red running", "running shoes"]
        );
    }

    #[test]
    fn test_analyze_unigrams_only() {
        assert_eq!(analyze("office chair", 1), vec!["office", "chair"]);
    }

    #[test]
    fn test_fit_vocabulary_is_alphabetical() {
        let (vectorizer, rows) = TfidfVectorizer::fit_transform(
            &docs(&["red running shoes", "blue running shoes", "office chair"]),
            VectorizerConfig::default(),
        )
        .unwrap();

        let terms = vectorizer.terms();
        let mut sorted = terms.to_vec();
        sorted.sort();
        assert_eq!(terms, sorted.as_slice());
        assert!(vectorizer.column("running shoes").is_some());
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert!((row.norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_smoothed_idf() {
        let (vectorizer, _) = TfidfVectorizer::fit_transform(
            &docs(&["red running shoes", "blue running shoes", "office chair"]),
            VectorizerConfig::default(),
        )
        .unwrap();

        let state = vectorizer.to_state();
        let running = vectorizer.column("running").unwrap() as usize;
        let office = vectorizer.column("office").unwrap() as usize;
        assert!((state.idf[running] - ((4.0f64 / 3.0).ln() + 1.0)).abs() < 1e-12);
        assert!((state.idf[office] - ((4.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let config = VectorizerConfig {
            max_features: 2,
            min_df: 1,
            ngram_max: 1,
        };
        let (vectorizer, _) = TfidfVectorizer::fit_transform(
            &docs(&["lamp lamp desk", "lamp desk chair", "sofa"]),
            config,
        )
        .unwrap();
        assert_eq!(vectorizer.terms(), &["desk".to_string(), "lamp".to_string()]);
    }

    #[test]
    fn test_min_df_filters_rare_terms() {
        let config = VectorizerConfig {
            max_features: 100,
            min_df: 2,
            ngram_max: 1,
        };
        let (vectorizer, rows) = TfidfVectorizer::fit_transform(
            &docs(&["lamp desk", "lamp chair"]),
            config,
        )
        .unwrap();
        assert_eq!(vectorizer.terms(), &["lamp".to_string()]);
        assert_eq!(rows[0], rows[1]);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let corpus = docs(&["red running shoes", "blue running shoes", "office chair"]);
        let (a, rows_a) =
            TfidfVectorizer::fit_transform(&corpus, VectorizerConfig::default()).unwrap();
        let (b, rows_b) =
            TfidfVectorizer::fit_transform(&corpus, VectorizerConfig::default()).unwrap();
        assert_eq!(a.to_state(), b.to_state());
        assert_eq!(rows_a, rows_b);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(
            TfidfVectorizer::fit_transform(&[], VectorizerConfig::default()).unwrap_err(),
            VectorizerError::EmptyCorpus
        );
        assert_eq!(
            TfidfVectorizer::fit_transform(&docs(&["the and of", "a"]), VectorizerConfig::default())
                .unwrap_err(),
            VectorizerError::EmptyVocabulary
        );
    }

    #[test]
    fn test_transform_matches_fit_rows() {
        let corpus = docs(&["red running shoes", "office chair"]);
        let (vectorizer, rows) =
            TfidfVectorizer::fit_transform(&corpus, VectorizerConfig::default()).unwrap();
        assert_eq!(vectorizer.transform(&corpus[0]), rows[0]);
        assert!(vectorizer.transform("unseen words entirely").is_zero());
    }

    #[test]
    fn test_from_state_rejects_mismatched_lengths() {
        let state = VectorizerState {
            config: VectorizerConfig::default(),
            terms: vec!["lamp".to_string()],
            idf: vec![],
        };
        assert!(matches!(
            TfidfVectorizer::from_state(state),
            Err(VectorizerError::InvalidState(_))
        ));
    }
}

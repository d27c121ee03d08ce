//! Vector space model: tokenization, TF-IDF weighting, sparse rows.

mod sparse;
mod stopwords;
mod vectorizer;

pub use sparse::SparseVector;
pub use stopwords::is_stop_word;
pub use vectorizer::{analyze, TfidfVectorizer, VectorizerError, VectorizerState};

//! Content-based product recommendations for the storefront.
//!
//! TF-IDF vectors over product text, cosine neighbors, purchase/view
//! weighted personalization and a sales-ranked popularity baseline.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod sources;
pub mod utils;

pub use config::Config;
pub use error::{AppError, EngineError, SourceError};
pub use services::RecommendationEngine;

//! Collaborators the engine reads from: the product corpus and customer
//! interaction history.

mod memory;
mod postgres;

pub use memory::{InMemoryCatalog, InMemoryHistory};
pub use postgres::{PgCatalog, PgHistory};

use crate::error::SourceError;
use crate::models::Product;
use async_trait::async_trait;

/// Source of approved products.
///
/// Identifiers must be stable across calls within one process lifetime.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductCorpusSource: Send + Sync {
    /// All approved products, in a stable order.
    async fn fetch_approved_products(&self) -> Result<Vec<Product>, SourceError>;

    /// Approved products by sales counter descending.
    async fn fetch_popular_products(&self, limit: usize) -> Result<Vec<Product>, SourceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionHistorySource: Send + Sync {
    /// Product ids from the customer's paid orders.
    async fn fetch_purchases(&self, customer_id: &str) -> Result<Vec<String>, SourceError>;

    /// Most recently viewed product ids, newest first.
    async fn fetch_recent_views(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, SourceError>;
}

use super::{InteractionHistorySource, ProductCorpusSource};
use crate::error::SourceError;
use crate::models::Product;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Product catalog held in memory, for local runs and tests.
///
/// Products keep insertion order. Toggle `set_available(false)` to simulate
/// an outage.
#[derive(Debug)]
pub struct InMemoryCatalog {
    products: RwLock<Vec<Product>>,
    available: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products),
            available: AtomicBool::new(true),
        }
    }

    pub fn replace(&self, products: Vec<Product>) {
        *self.products.write() = products;
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), SourceError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SourceError::Unavailable("in-memory catalog offline".to_string()))
        }
    }
}

#[async_trait]
impl ProductCorpusSource for InMemoryCatalog {
    async fn fetch_approved_products(&self) -> Result<Vec<Product>, SourceError> {
        self.check_available()?;
        Ok(self
            .products
            .read()
            .iter()
            .filter(|p| p.is_approved())
            .cloned()
            .collect())
    }

    async fn fetch_popular_products(&self, limit: usize) -> Result<Vec<Product>, SourceError> {
        self.check_available()?;
        let mut approved: Vec<Product> = self
            .products
            .read()
            .iter()
            .filter(|p| p.is_approved())
            .cloned()
            .collect();

        // Stable sort: equal counters keep catalog order; missing counters last
        approved.sort_by_key(|p| Reverse(p.sold.map(|s| (1, s)).unwrap_or((0, 0))));
        approved.truncate(limit);
        Ok(approved)
    }
}

/// Interaction history held in memory.
#[derive(Debug)]
pub struct InMemoryHistory {
    purchases: RwLock<HashMap<String, Vec<String>>>,
    // newest first
    views: RwLock<HashMap<String, Vec<String>>>,
    available: AtomicBool,
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self {
            purchases: RwLock::new(HashMap::new()),
            views: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn record_purchase(&self, customer_id: &str, product_id: &str) {
        self.purchases
            .write()
            .entry(customer_id.to_string())
            .or_default()
            .push(product_id.to_string());
    }

    pub fn record_view(&self, customer_id: &str, product_id: &str) {
        self.views
            .write()
            .entry(customer_id.to_string())
            .or_default()
            .insert(0, product_id.to_string());
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), SourceError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SourceError::Unavailable("in-memory history offline".to_string()))
        }
    }
}

#[async_trait]
impl InteractionHistorySource for InMemoryHistory {
    async fn fetch_purchases(&self, customer_id: &str) -> Result<Vec<String>, SourceError> {
        self.check_available()?;
        Ok(self
            .purchases
            .read()
            .get(customer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_recent_views(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, SourceError> {
        self.check_available()?;
        Ok(self
            .views
            .read()
            .get(customer_id)
            .map(|views| views.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductStatus;

    #[tokio::test]
    async fn test_catalog_filters_unapproved() {
        let catalog = InMemoryCatalog::new(vec![
            Product::new("a", "Lamp", "home"),
            Product::new("b", "Desk", "home").with_status(ProductStatus::Pending),
        ]);
        let products = catalog.fetch_approved_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "a");
    }

    #[tokio::test]
    async fn test_popular_orders_by_sold() {
        let catalog = InMemoryCatalog::new(vec![
            Product::new("a", "Lamp", "home").with_sold(5),
            Product::new("b", "Desk", "home"),
            Product::new("c", "Chair", "home").with_sold(50),
            Product::new("d", "Rug", "home").with_sold(5),
        ]);
        let ids: Vec<String> = catalog
            .fetch_popular_products(10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "d", "b"]);

        assert_eq!(catalog.fetch_popular_products(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_catalog() {
        let catalog = InMemoryCatalog::new(vec![]);
        catalog.set_available(false);
        assert!(catalog.fetch_approved_products().await.is_err());
    }

    #[tokio::test]
    async fn test_views_newest_first_and_limited() {
        let history = InMemoryHistory::new();
        for product in ["p1", "p2", "p3"] {
            history.record_view("cust", product);
        }
        let views = history.fetch_recent_views("cust", 2).await.unwrap();
        assert_eq!(views, vec!["p3", "p2"]);
        assert!(history.fetch_purchases("nobody").await.unwrap().is_empty());
    }
}

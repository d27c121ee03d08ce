//! Popularity fallback: approved products by sales counter.
//!
//! Has no model dependency, so it answers even before the first train.

use crate::error::EngineError;
use crate::models::Recommendation;
use crate::sources::ProductCorpusSource;
use crate::utils::with_timeout;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

pub async fn popular(
    catalog: &dyn ProductCorpusSource,
    limit: usize,
    deadline: Duration,
) -> Result<Vec<Recommendation>, EngineError> {
    let products = with_timeout(deadline, catalog.fetch_popular_products(limit)).await?;

    debug!(count = products.len(), "Popularity ranking fetched");

    Ok(products
        .iter()
        .take(limit)
        .map(Recommendation::from_popular)
        .collect())
}

/// Popular products minus `exclude`, still returning up to `limit` items.
pub async fn popular_excluding(
    catalog: &dyn ProductCorpusSource,
    limit: usize,
    exclude: &HashSet<&str>,
    deadline: Duration,
) -> Result<Vec<Recommendation>, EngineError> {
    if exclude.is_empty() {
        return popular(catalog, limit, deadline).await;
    }

    let widened = limit.saturating_add(exclude.len());
    let mut items = popular(catalog, widened, deadline).await?;
    items.retain(|r| !exclude.contains(r.product_id.as_str()));
    items.truncate(limit);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::models::Product;
    use crate::sources::MockProductCorpusSource;

    fn products() -> Vec<Product> {
        vec![
            Product::new("a", "Chair", "home").with_sold(30),
            Product::new("b", "Lamp", "home").with_sold(20),
            Product::new("c", "Rug", "home"),
        ]
    }

    #[tokio::test]
    async fn test_scores_are_sales_counters() {
        let mut catalog = MockProductCorpusSource::new();
        catalog
            .expect_fetch_popular_products()
            .returning(|_| Ok(products()));

        let items = popular(&catalog, 10, Duration::from_secs(1)).await.unwrap();
        let scores: Vec<f64> = items.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![30.0, 20.0, 0.0]);
    }

    #[tokio::test]
    async fn test_excluding_widens_the_fetch() {
        let mut catalog = MockProductCorpusSource::new();
        catalog
            .expect_fetch_popular_products()
            .withf(|limit| *limit == 3)
            .returning(|_| Ok(products()));

        let exclude: HashSet<&str> = ["a"].into_iter().collect();
        let items = popular_excluding(&catalog, 2, &exclude, Duration::from_secs(1))
            .await
            .unwrap();
        let ids: Vec<&str> = items.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_source_failure_propagates() {
        let mut catalog = MockProductCorpusSource::new();
        catalog
            .expect_fetch_popular_products()
            .returning(|_| Err(SourceError::Unavailable("down".to_string())));

        let result = popular(&catalog, 10, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(EngineError::DataSourceUnavailable(_))));
    }
}

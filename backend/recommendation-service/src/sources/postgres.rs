use super::{InteractionHistorySource, ProductCorpusSource};
use crate::error::SourceError;
use crate::models::{Product, ProductStatus};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::error;

const MAX_ID_LEN: usize = 128;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: Option<String>,
    category: Option<String>,
    description: Option<String>,
    key_features: Option<Vec<String>>,
    specifications: Option<Json<Map<String, Value>>>,
    status: String,
    sold: Option<i64>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            category: row.category,
            description: row.description,
            key_features: row.key_features.unwrap_or_default(),
            specifications: row.specifications.map(|j| j.0).unwrap_or_default(),
            status: ProductStatus::parse(&row.status),
            sold: row.sold,
        }
    }
}

/// Product corpus backed by the `products` table.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCorpusSource for PgCatalog {
    async fn fetch_approved_products(&self) -> Result<Vec<Product>, SourceError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, category, description, key_features, specifications, status, sold
            FROM products
            WHERE status = 'approved'
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load approved products: {}", e);
            SourceError::from(e)
        })?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn fetch_popular_products(&self, limit: usize) -> Result<Vec<Product>, SourceError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, category, description, key_features, specifications, status, sold
            FROM products
            WHERE status = 'approved'
            ORDER BY sold DESC NULLS LAST, id
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load popular products: {}", e);
            SourceError::from(e)
        })?;

        Ok(rows.into_iter().map(Product::from).collect())
    }
}

/// Interaction history backed by `orders`, `order_items` and `view_history`.
#[derive(Clone)]
pub struct PgHistory {
    pool: PgPool,
}

impl PgHistory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn validate_customer_id(customer_id: &str) -> Result<(), SourceError> {
    if customer_id.trim().is_empty() || customer_id.len() > MAX_ID_LEN {
        return Err(SourceError::InvalidId(customer_id.to_string()));
    }
    Ok(())
}

#[async_trait]
impl InteractionHistorySource for PgHistory {
    async fn fetch_purchases(&self, customer_id: &str) -> Result<Vec<String>, SourceError> {
        validate_customer_id(customer_id)?;

        sqlx::query_scalar::<_, String>(
            r#"
            SELECT oi.product_id
            FROM orders o
            JOIN order_items oi ON oi.order_id = o.id
            WHERE o.customer_id = $1 AND o.payment_status = 'paid'
            ORDER BY o.created_at, o.id, oi.position
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load purchases: {}", e);
            SourceError::from(e)
        })
    }

    async fn fetch_recent_views(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, SourceError> {
        validate_customer_id(customer_id)?;

        sqlx::query_scalar::<_, String>(
            r#"
            SELECT product_id
            FROM view_history
            WHERE customer_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(customer_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load view history: {}", e);
            SourceError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_customer_id() {
        assert!(validate_customer_id("cust-1").is_ok());
        assert!(matches!(
            validate_customer_id("  "),
            Err(SourceError::InvalidId(_))
        ));
        assert!(validate_customer_id(&"x".repeat(MAX_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_row_conversion_defaults() {
        let mut specs = Map::new();
        specs.insert("color".to_string(), json!("red"));
        let row = ProductRow {
            id: "p1".to_string(),
            name: Some("Lamp".to_string()),
            category: None,
            description: None,
            key_features: None,
            specifications: Some(Json(specs)),
            status: "approved".to_string(),
            sold: None,
        };
        let product = Product::from(row);
        assert!(product.is_approved());
        assert!(product.key_features.is_empty());
        assert_eq!(product.specifications["color"], json!("red"));
    }
}

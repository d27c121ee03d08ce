use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A catalog product as read from the corpus source.
///
/// Every text field is optional; missing fields featurize as empty strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub key_features: Vec<String>,
    #[serde(default)]
    pub specifications: Map<String, Value>,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub sold: Option<i64>,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            category: Some(category.into()),
            status: ProductStatus::Approved,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_key_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_features = features.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_specification(mut self, name: impl Into<String>, value: Value) -> Self {
        self.specifications.insert(name.into(), value);
        self
    }

    pub fn with_sold(mut self, sold: i64) -> Self {
        self.sold = Some(sold);
        self
    }

    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_approved(&self) -> bool {
        self.status == ProductStatus::Approved
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Pending => "pending",
            ProductStatus::Approved => "approved",
            ProductStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "approved" => ProductStatus::Approved,
            "rejected" => ProductStatus::Rejected,
            _ => ProductStatus::Pending,
        }
    }
}

/// The part of a product the model keeps after training: enough to label a
/// recommendation without going back to the corpus source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub category: String,
}

impl From<&Product> for CatalogEntry {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone().unwrap_or_default(),
            category: product.category.clone().unwrap_or_default(),
        }
    }
}

/// A customer's interaction history, read fresh per request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionRecord {
    pub customer_id: String,
    /// Products from paid orders
    pub purchased: Vec<String>,
    /// Most recent views, newest first
    pub viewed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub product_id: String,
    pub score: f64,
    pub name: String,
    pub category: String,
}

impl Recommendation {
    pub fn from_entry(entry: &CatalogEntry, score: f64) -> Self {
        Self {
            product_id: entry.id.clone(),
            score,
            name: entry.name.clone(),
            category: entry.category.clone(),
        }
    }

    /// Popularity scores are the raw sales counter.
    pub fn from_popular(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            score: product.sold.unwrap_or(0) as f64,
            name: product.name.clone().unwrap_or_default(),
            category: product.category.clone().unwrap_or_default(),
        }
    }
}

/// Which signal produced a personalized response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    /// Similarity aggregated over the customer's history
    Personalized,
    /// Customer has no history
    Popularity,
    /// A richer signal failed and popularity stood in
    Fallback,
}

impl RecommendationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationSource::Personalized => "personalized",
            RecommendationSource::Popularity => "popularity",
            RecommendationSource::Fallback => "fallback",
        }
    }
}

/// Similarity results; `model_ready` is false when no model was loaded to
/// answer, as opposed to an unknown product.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarProducts {
    pub items: Vec<Recommendation>,
    pub model_ready: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonalizedRecommendations {
    pub items: Vec<Recommendation>,
    pub source: RecommendationSource,
}

/// Model lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    Uninitialized,
    Training,
    Ready,
    Failed,
}

impl ModelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::Uninitialized => "uninitialized",
            ModelState::Training => "training",
            ModelState::Ready => "ready",
            ModelState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub state: ModelState,
    /// True whenever a model is loaded, including while a retrain runs
    pub model_loaded: bool,
    pub products_count: usize,
    pub vocabulary_size: usize,
    pub generation: Option<Uuid>,
    pub trained_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrainReport {
    pub products_count: usize,
    pub vocabulary_size: usize,
    pub generation: Uuid,
    pub trained_at: DateTime<Utc>,
    /// False when the in-memory model swapped in but the snapshot write failed
    pub persisted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_deserializes_with_missing_fields() {
        let product: Product = serde_json::from_value(json!({ "id": "p1" })).unwrap();
        assert_eq!(product.id, "p1");
        assert!(product.name.is_none());
        assert!(product.key_features.is_empty());
        assert!(product.specifications.is_empty());
        assert_eq!(product.status, ProductStatus::Pending);
    }

    #[test]
    fn test_popular_recommendation_defaults_score_to_zero() {
        let product = Product::new("p1", "Lamp", "home");
        let rec = Recommendation::from_popular(&product);
        assert_eq!(rec.score, 0.0);

        let rec = Recommendation::from_popular(&product.with_sold(42));
        assert_eq!(rec.score, 42.0);
    }

    #[test]
    fn test_recommendation_serializes_camel_case() {
        let rec = Recommendation {
            product_id: "p1".to_string(),
            score: 0.5,
            name: "Lamp".to_string(),
            category: "home".to_string(),
        };
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["productId"], "p1");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ProductStatus::parse("approved"), ProductStatus::Approved);
        assert_eq!(ProductStatus::parse("weird"), ProductStatus::Pending);
        assert_eq!(ProductStatus::Approved.as_str(), "approved");
    }
}

//! Recommendation engine: owns the model lifecycle and answers the four query
//! operations.
//!
//! Fallback chain for personalized requests:
//!   personalized -> popularity (minus interacted) -> empty
//! A failure in a richer signal is logged and never blocks a cruder one.

use super::aggregator::{aggregate, InteractionSet};
use super::model::TrainedModel;
use super::model_slot::ModelSlot;
use super::popularity::{popular, popular_excluding};
use super::similarity::similar_to;
use super::snapshot::SnapshotStore;
use crate::config::{RecommendationConfig, VectorizerConfig};
use crate::error::EngineError;
use crate::models::{
    InteractionRecord, ModelState, ModelStatus, PersonalizedRecommendations, Recommendation,
    RecommendationSource, SimilarProducts, TrainReport,
};
use crate::sources::{InteractionHistorySource, ProductCorpusSource};
use crate::utils::with_timeout;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct RecommendationEngine {
    catalog: Arc<dyn ProductCorpusSource>,
    history: Arc<dyn InteractionHistorySource>,
    slot: ModelSlot,
    snapshots: Option<SnapshotStore>,
    /// Serializes train runs; queries never take it
    train_lock: Mutex<()>,
    vectorizer: VectorizerConfig,
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn ProductCorpusSource>,
        history: Arc<dyn InteractionHistorySource>,
        vectorizer: VectorizerConfig,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            catalog,
            history,
            slot: ModelSlot::new(),
            snapshots: None,
            train_lock: Mutex::new(()),
            vectorizer,
            config,
        }
    }

    /// Persist every successful train to `store` and load from it on startup.
    pub fn with_snapshots(mut self, store: SnapshotStore) -> Self {
        self.snapshots = Some(store);
        self
    }

    /// Startup: load the snapshot, or train once if it is absent or corrupt.
    ///
    /// Never fails; the returned state says what the service can answer.
    pub async fn initialize(&self) -> ModelState {
        if let Some(store) = self.snapshots.clone() {
            let guard = self.train_lock.lock().await;
            match tokio::task::spawn_blocking(move || store.load()).await {
                Ok(Ok(Some(model))) => {
                    self.slot.install(Arc::new(model)).await;
                    return ModelState::Ready;
                }
                Ok(Ok(None)) => info!("No model snapshot found, training from corpus"),
                Ok(Err(e)) => warn!("Discarding model snapshot: {}", e),
                Err(e) => warn!("Snapshot load task failed: {}", e),
            }
            drop(guard);
        }

        if let Err(e) = self.train().await {
            warn!(
                "Bootstrap train failed, serving popularity only until the next train: {}",
                e
            );
        }
        self.slot.state().await
    }

    /// Rebuild the model from the current corpus and swap it in.
    ///
    /// On failure the previously served model, if any, stays in place.
    pub async fn train(&self) -> Result<TrainReport, EngineError> {
        let _guard = self.train_lock.lock().await;
        self.slot.set_state(ModelState::Training).await;

        match self.build_and_install().await {
            Ok(report) => Ok(report),
            Err(e) => {
                let state = self.slot.mark_failed().await;
                warn!(state = state.as_str(), "Model training failed: {}", e);
                Err(e)
            }
        }
    }

    async fn build_and_install(&self) -> Result<TrainReport, EngineError> {
        let mut products = with_timeout(
            self.config.train_timeout(),
            self.catalog.fetch_approved_products(),
        )
        .await?;
        products.retain(|p| p.is_approved());

        if products.is_empty() {
            return Err(EngineError::EmptyCorpus);
        }

        let vectorizer = self.vectorizer;
        let model = tokio::task::spawn_blocking(move || TrainedModel::train(&products, vectorizer))
            .await
            .map_err(|e| EngineError::Internal(format!("Training task panicked: {e}")))??;
        let model = Arc::new(model);

        self.slot.install(model.clone()).await;

        info!(
            products = model.product_count(),
            vocabulary = model.vocabulary_size(),
            generation = %model.generation(),
            "Model trained"
        );

        let persisted = self.persist(model.clone()).await;

        Ok(TrainReport {
            products_count: model.product_count(),
            vocabulary_size: model.vocabulary_size(),
            generation: model.generation(),
            trained_at: model.trained_at(),
            persisted,
        })
    }

    async fn persist(&self, model: Arc<TrainedModel>) -> bool {
        let Some(store) = self.snapshots.clone() else {
            return false;
        };

        match tokio::task::spawn_blocking(move || store.save(&model)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Model snapshot not saved, serving from memory only: {}", e);
                false
            }
            Err(e) => {
                warn!("Snapshot save task failed: {}", e);
                false
            }
        }
    }

    /// Products most similar to `product_id`.
    ///
    /// Unknown ids give an empty list; so does a missing model, flagged
    /// through `model_ready`.
    pub async fn similar_to(&self, product_id: &str, limit: Option<usize>) -> SimilarProducts {
        let limit = self.config.resolve_limit(limit);

        let model = match self.current_model().await {
            Ok(model) => model,
            Err(e) => {
                warn!(product_id, "Similarity unavailable: {}", e);
                return SimilarProducts {
                    items: Vec::new(),
                    model_ready: false,
                };
            }
        };
        if limit == 0 {
            return SimilarProducts {
                items: Vec::new(),
                model_ready: true,
            };
        }

        let items = similar_to(&model, product_id, limit);
        if items.is_empty() && model.position_of(product_id).is_none() {
            debug!(product_id, "Unknown product for similarity");
        }

        SimilarProducts {
            items,
            model_ready: true,
        }
    }

    /// Personalized recommendations with a recorded provenance.
    pub async fn recommend_for(
        &self,
        customer_id: &str,
        limit: Option<usize>,
    ) -> PersonalizedRecommendations {
        let limit = self.config.resolve_limit(limit);
        if limit == 0 {
            return PersonalizedRecommendations {
                items: Vec::new(),
                source: RecommendationSource::Personalized,
            };
        }

        let record = match self.fetch_interactions(customer_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(customer_id, "History unavailable, using popularity: {}", e);
                return self
                    .popularity_fallback(limit, &HashSet::new(), RecommendationSource::Fallback)
                    .await;
            }
        };

        let interactions = InteractionSet::from_record(&record);
        if interactions.is_empty() {
            debug!(customer_id, "No interaction history, using popularity");
            return self
                .popularity_fallback(limit, &HashSet::new(), RecommendationSource::Popularity)
                .await;
        }

        let exclude: HashSet<&str> = interactions.ids().iter().map(String::as_str).collect();

        let model = match self.current_model().await {
            Ok(model) => model,
            Err(e) => {
                warn!(customer_id, "{}, using popularity", e);
                return self
                    .popularity_fallback(limit, &exclude, RecommendationSource::Fallback)
                    .await;
            }
        };

        let items = aggregate(&model, &interactions, &self.config, limit);
        if items.is_empty() {
            warn!(
                customer_id,
                interactions = interactions.len(),
                "Interactions produced no candidates, using popularity"
            );
            return self
                .popularity_fallback(limit, &exclude, RecommendationSource::Fallback)
                .await;
        }

        debug!(customer_id, count = items.len(), "Personalized recommendations");
        PersonalizedRecommendations {
            items,
            source: RecommendationSource::Personalized,
        }
    }

    /// Approved products by sales counter. Independent of the model.
    pub async fn popular(&self, limit: Option<usize>) -> Result<Vec<Recommendation>, EngineError> {
        let limit = self.config.resolve_limit(limit);
        if limit == 0 {
            return Ok(Vec::new());
        }
        popular(self.catalog.as_ref(), limit, self.config.source_timeout()).await
    }

    pub async fn status(&self) -> ModelStatus {
        let (model, state) = self.slot.snapshot().await;
        match model {
            Some(model) => ModelStatus {
                state,
                model_loaded: true,
                products_count: model.product_count(),
                vocabulary_size: model.vocabulary_size(),
                generation: Some(model.generation()),
                trained_at: Some(model.trained_at()),
            },
            None => ModelStatus {
                state,
                model_loaded: false,
                products_count: 0,
                vocabulary_size: 0,
                generation: None,
                trained_at: None,
            },
        }
    }

    async fn current_model(&self) -> Result<Arc<TrainedModel>, EngineError> {
        self.slot.current().await.ok_or(EngineError::ModelNotReady)
    }

    async fn fetch_interactions(&self, customer_id: &str) -> Result<InteractionRecord, EngineError> {
        let deadline = self.config.source_timeout();
        let (purchased, viewed) = tokio::join!(
            with_timeout(deadline, self.history.fetch_purchases(customer_id)),
            with_timeout(
                deadline,
                self.history
                    .fetch_recent_views(customer_id, self.config.view_history_limit)
            ),
        );

        Ok(InteractionRecord {
            customer_id: customer_id.to_string(),
            purchased: purchased?,
            viewed: viewed?,
        })
    }

    async fn popularity_fallback(
        &self,
        limit: usize,
        exclude: &HashSet<&str>,
        source: RecommendationSource,
    ) -> PersonalizedRecommendations {
        let items = match popular_excluding(
            self.catalog.as_ref(),
            limit,
            exclude,
            self.config.source_timeout(),
        )
        .await
        {
            Ok(items) => items,
            Err(e) => {
                warn!("Popularity fallback failed, returning nothing: {}", e);
                Vec::new()
            }
        };

        PersonalizedRecommendations { items, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::models::Product;
    use crate::sources::{MockInteractionHistorySource, MockProductCorpusSource};

    fn corpus() -> Vec<Product> {
        vec![
            Product::new("A", "red running shoes", "").with_sold(5),
            Product::new("B", "blue running shoes", "").with_sold(50),
            Product::new("C", "office chair", "").with_sold(20),
        ]
    }

    fn catalog_with(products: Vec<Product>) -> MockProductCorpusSource {
        let mut catalog = MockProductCorpusSource::new();
        let approved = products.clone();
        catalog
            .expect_fetch_approved_products()
            .returning(move || Ok(approved.clone()));
        catalog.expect_fetch_popular_products().returning(move |limit| {
            let mut ranked = products.clone();
            ranked.sort_by(|a, b| b.sold.cmp(&a.sold));
            ranked.truncate(limit);
            Ok(ranked)
        });
        catalog
    }

    fn history_with(purchases: Vec<&str>, views: Vec<&str>) -> MockInteractionHistorySource {
        let purchases: Vec<String> = purchases.into_iter().map(String::from).collect();
        let views: Vec<String> = views.into_iter().map(String::from).collect();
        let mut history = MockInteractionHistorySource::new();
        history
            .expect_fetch_purchases()
            .returning(move |_| Ok(purchases.clone()));
        history
            .expect_fetch_recent_views()
            .returning(move |_, _| Ok(views.clone()));
        history
    }

    fn engine(
        catalog: MockProductCorpusSource,
        history: MockInteractionHistorySource,
    ) -> RecommendationEngine {
        RecommendationEngine::new(
            Arc::new(catalog),
            Arc::new(history),
            VectorizerConfig::default(),
            RecommendationConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_queries_before_training() {
        let engine = engine(catalog_with(corpus()), history_with(vec!["A"], vec![]));

        let similar = engine.similar_to("A", None).await;
        assert!(similar.items.is_empty());
        assert!(!similar.model_ready);

        let personal = engine.recommend_for("cust", Some(2)).await;
        assert_eq!(personal.source, RecommendationSource::Fallback);
        let ids: Vec<&str> = personal.items.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C"]);

        assert_eq!(engine.status().await.state, ModelState::Uninitialized);
    }

    #[tokio::test]
    async fn test_empty_slot_is_model_not_ready() {
        let engine = engine(catalog_with(corpus()), history_with(vec![], vec![]));
        assert!(matches!(
            engine.current_model().await,
            Err(EngineError::ModelNotReady)
        ));

        engine.train().await.unwrap();
        assert!(engine.current_model().await.is_ok());
    }

    #[tokio::test]
    async fn test_train_then_similar() {
        let engine = engine(catalog_with(corpus()), history_with(vec![], vec![]));
        let report = engine.train().await.unwrap();
        assert_eq!(report.products_count, 3);
        assert!(!report.persisted);

        let similar = engine.similar_to("A", Some(2)).await;
        assert!(similar.model_ready);
        assert_eq!(similar.items[0].product_id, "B");

        let status = engine.status().await;
        assert_eq!(status.state, ModelState::Ready);
        assert_eq!(status.generation, Some(report.generation));
    }

    #[tokio::test]
    async fn test_train_source_failure_keeps_state() {
        let mut catalog = MockProductCorpusSource::new();
        catalog
            .expect_fetch_approved_products()
            .returning(|| Err(SourceError::Unavailable("down".to_string())));
        let engine = engine(catalog, history_with(vec![], vec![]));

        let err = engine.train().await.unwrap_err();
        assert!(err.is_source_failure());
        assert_eq!(engine.status().await.state, ModelState::Failed);
    }

    #[tokio::test]
    async fn test_history_failure_falls_back() {
        let mut history = MockInteractionHistorySource::new();
        history
            .expect_fetch_purchases()
            .returning(|_| Err(SourceError::InvalidId("".to_string())));
        history.expect_fetch_recent_views().returning(|_, _| Ok(vec![]));
        let engine = engine(catalog_with(corpus()), history);
        engine.train().await.unwrap();

        let personal = engine.recommend_for("", None).await;
        assert_eq!(personal.source, RecommendationSource::Fallback);
        assert_eq!(personal.items.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_history_matches_popular() {
        let engine = engine(catalog_with(corpus()), history_with(vec![], vec![]));
        engine.train().await.unwrap();

        let personal = engine.recommend_for("new-customer", Some(2)).await;
        assert_eq!(personal.source, RecommendationSource::Popularity);
        assert_eq!(personal.items, engine.popular(Some(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_personalized_excludes_interacted() {
        let engine = engine(catalog_with(corpus()), history_with(vec!["A"], vec![]));
        engine.train().await.unwrap();

        let personal = engine.recommend_for("cust", None).await;
        assert_eq!(personal.source, RecommendationSource::Personalized);
        assert_eq!(personal.items[0].product_id, "B");
        assert!(personal.items.iter().all(|r| r.product_id != "A"));
    }

    #[tokio::test]
    async fn test_popular_failure_empties_fallback() {
        let mut catalog = MockProductCorpusSource::new();
        catalog
            .expect_fetch_popular_products()
            .returning(|_| Err(SourceError::Unavailable("down".to_string())));
        let engine = engine(catalog, history_with(vec![], vec![]));

        let personal = engine.recommend_for("cust", None).await;
        assert!(personal.items.is_empty());
        assert!(engine.popular(None).await.is_err());
    }
}

/// Recommendation API Handlers
///
/// Thin HTTP surface over `RecommendationEngine`; response shapes follow the
/// storefront's existing client contract.
use actix_web::{get, post, web, HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ModelState, Recommendation, RecommendationSource};
use crate::services::RecommendationEngine;

const SERVICE_NAME: &str = "E-commerce ML Recommendation Service";

/// Handler state shared by every route
pub struct RecommendationHandlerState {
    pub engine: Arc<RecommendationEngine>,
}

/// Query parameters shared by the list endpoints
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    /// Result count (default 10, capped server-side)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub status: &'static str,
    pub model_loaded: bool,
    pub products_count: usize,
    pub state: ModelState,
    pub vocabulary_size: usize,
    pub generation: Option<Uuid>,
    pub trained_at: Option<DateTime<Utc>>,
}

/// Same shape on success and failure; a failed train reports the model
/// still being served.
#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub success: bool,
    pub message: String,
    pub products_count: usize,
    pub vocabulary_size: usize,
    pub generation: Option<Uuid>,
    pub persisted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarResponse {
    pub success: bool,
    pub product_id: String,
    pub recommendations: Vec<Recommendation>,
    pub count: usize,
    pub model_ready: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecommendationsResponse {
    pub success: bool,
    pub customer_id: String,
    pub recommendations: Vec<Recommendation>,
    pub count: usize,
    pub source: RecommendationSource,
}

#[derive(Debug, Serialize)]
pub struct PopularResponse {
    pub success: bool,
    pub products: Vec<Recommendation>,
    pub count: usize,
}

/// GET /
#[get("/")]
pub async fn status(state: web::Data<RecommendationHandlerState>) -> HttpResponse {
    let status = state.engine.status().await;

    HttpResponse::Ok().json(StatusResponse {
        service: SERVICE_NAME,
        status: "running",
        model_loaded: status.model_loaded,
        products_count: status.products_count,
        state: status.state,
        vocabulary_size: status.vocabulary_size,
        generation: status.generation,
        trained_at: status.trained_at,
    })
}

/// GET /health
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// POST /train
/// Rebuild the model from the current catalog
#[post("/train")]
pub async fn train(state: web::Data<RecommendationHandlerState>) -> HttpResponse {
    match state.engine.train().await {
        Ok(report) => {
            info!(products = report.products_count, "Train request completed");

            HttpResponse::Ok().json(TrainResponse {
                success: true,
                message: "Model trained successfully".to_string(),
                products_count: report.products_count,
                vocabulary_size: report.vocabulary_size,
                generation: Some(report.generation),
                persisted: report.persisted,
            })
        }
        Err(e) => {
            let message = format!("Model training failed: {e}");
            let code = AppError::from(e).status_code();
            let active = state.engine.status().await;

            HttpResponse::build(code).json(TrainResponse {
                success: false,
                message,
                products_count: active.products_count,
                vocabulary_size: active.vocabulary_size,
                generation: active.generation,
                persisted: false,
            })
        }
    }
}

/// GET /recommendations/similar/{product_id}
#[get("/recommendations/similar/{product_id}")]
pub async fn get_similar(
    path: web::Path<String>,
    query: web::Query<LimitQuery>,
    state: web::Data<RecommendationHandlerState>,
) -> HttpResponse {
    let product_id = path.into_inner();
    let similar = state.engine.similar_to(&product_id, query.limit).await;

    HttpResponse::Ok().json(SimilarResponse {
        success: true,
        count: similar.items.len(),
        product_id,
        recommendations: similar.items,
        model_ready: similar.model_ready,
    })
}

/// GET /recommendations/user/{customer_id}
#[get("/recommendations/user/{customer_id}")]
pub async fn get_user_recommendations(
    path: web::Path<String>,
    query: web::Query<LimitQuery>,
    state: web::Data<RecommendationHandlerState>,
) -> HttpResponse {
    let customer_id = path.into_inner();
    let result = state.engine.recommend_for(&customer_id, query.limit).await;

    HttpResponse::Ok().json(UserRecommendationsResponse {
        success: true,
        count: result.items.len(),
        customer_id,
        recommendations: result.items,
        source: result.source,
    })
}

/// GET /recommendations/popular
#[get("/recommendations/popular")]
pub async fn get_popular(
    query: web::Query<LimitQuery>,
    state: web::Data<RecommendationHandlerState>,
) -> HttpResponse {
    let products = match state.engine.popular(query.limit).await {
        Ok(products) => products,
        Err(e) => {
            warn!("Popular products unavailable: {}", e);
            Vec::new()
        }
    };

    HttpResponse::Ok().json(PopularResponse {
        success: true,
        count: products.len(),
        products,
    })
}

pub mod recommendation;

pub use recommendation::{
    get_popular, get_similar, get_user_recommendations, health, status, train,
    RecommendationHandlerState,
};

use crate::error::AppError;
use actix_web::web;

/// Register every route on an actix app or scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(status)
    .service(health)
    .service(train)
    .service(get_popular)
    .service(get_similar)
    .service(get_user_recommendations);
}

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recommendation_service::config::Config;
use recommendation_service::handlers::{configure, RecommendationHandlerState};
use recommendation_service::services::{RecommendationEngine, SnapshotStore};
use recommendation_service::sources::{PgCatalog, PgHistory};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!(
        "Starting recommendation-service v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Environment: {}", config.app.env);

    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to create database pool")?;

    sqlx::migrate!()
        .run(&db_pool)
        .await
        .context("Failed to run migrations")?;

    let engine = RecommendationEngine::new(
        Arc::new(PgCatalog::new(db_pool.clone())),
        Arc::new(PgHistory::new(db_pool)),
        config.model.vectorizer,
        config.recommendation,
    )
    .with_snapshots(SnapshotStore::new(&config.model.snapshot_dir));
    let engine = Arc::new(engine);

    let state = engine.initialize().await;
    tracing::info!(state = state.as_str(), "Model initialization finished");

    let handler_state = web::Data::new(RecommendationHandlerState { engine });

    tracing::info!("Listening on 0.0.0.0:{}", config.app.port);

    HttpServer::new(move || {
        App::new()
            .app_data(handler_state.clone())
            .configure(configure)
    })
    .bind(("0.0.0.0", config.app.port))
    .context("Failed to bind HTTP listener")?
    .run()
    .await
    .context("HTTP server error")?;

    tracing::info!("recommendation-service shut down");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

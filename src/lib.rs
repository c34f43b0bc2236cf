pub mod config;
pub mod database;
pub mod redis_client;
pub mod error;
pub mod extract;
pub mod filters;
pub mod pagination;
pub mod models;
pub mod controllers;
pub mod middleware;
pub mod cache;
pub mod services;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    /// None, если Redis не настроен
    pub cache: Option<cache::CacheService>,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database).await?;
        tracing::info!("Database connected");

        db.run_migrations().await?;

        let cache = match config.redis.url.as_deref() {
            Some(url) => match redis_client::RedisClient::connect(url).await {
                Ok(redis) => Some(cache::CacheService::new(redis, config.redis.cache_ttl_seconds)),
                Err(e) => {
                    tracing::warn!("Redis unavailable, response cache disabled: {:?}", e);
                    None
                }
            },
            None => {
                tracing::info!("REDIS_URL not set, response cache disabled");
                None
            }
        };

        Ok(Arc::new(Self { db, cache, config }))
    }

    /// Сбрасывает закешированные списки сеансов. Ошибку только логируем.
    pub async fn invalidate_sessions(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate_sessions().await {
                tracing::warn!("Failed to invalidate session listings: {:?}", e);
            }
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let cache = match &state.cache {
        Some(cache) => match cache.ping().await {
            Ok(()) => "ok",
            Err(_) => "unavailable",
        },
        None => "disabled",
    };
    (StatusCode::OK, Json(json!({ "status": "ok", "cache": cache })))
}

/// Главный роутер: `/`, `/health` и все ресурсы под `/api`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Cinema API v1.0" }))
        .route("/health", get(health))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

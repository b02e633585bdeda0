//! HTTP surface of the sync server.
//!
//! # Endpoints
//!
//! - `GET /health`: liveness check
//! - `POST /api/sync`: push or pull, selected by the `action` field
//! - `GET /api/sync?since=`: stateless change feed
//! - `POST /api/shot-analysis`: assess a shot and store the result
//! - `GET /api/shot-analysis?userId=`: recent assessments

pub mod config;
pub mod error;
mod shot;
mod sync;

pub use config::ServerConfig;
pub use error::ApiError;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: ServerConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sync", get(sync::feed).post(sync::sync))
        .route(
            "/api/shot-analysis",
            get(shot::history).post(shot::analyze),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::test_app;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_health() {
        let app = test_app().await;
        let (status, body) = app.send(Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use concierge_core::repository::{AnalyticsSink, CacheStore};

use crate::state::AppState;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct Banner {
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub api: bool,
    pub database: bool,
    pub cache: bool,
    pub llm: bool,
    pub quotes: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub services: ServiceStatus,
}

pub async fn root() -> Json<Banner> {
    Json(Banner {
        message: "Flight Concierge API",
        version: VERSION,
    })
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (database, cache) = tokio::join!(
        state.backends.analytics.ping(),
        state.backends.cache.ping()
    );

    Json(HealthResponse {
        status: "healthy",
        version: VERSION,
        timestamp: Utc::now(),
        services: ServiceStatus {
            api: true,
            database,
            cache,
            llm: state.search.insights_available(),
            quotes: state.search.quotes_live(),
        },
    })
}

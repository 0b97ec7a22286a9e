use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use concierge_core::repository::AnalyticsSink;
use concierge_core::SearchAnalyticsRecord;

use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 500;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/search-analytics", get(search_analytics))
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub analytics: Vec<SearchAnalyticsRecord>,
    pub count: usize,
}

/// GET /api/search-analytics
pub async fn search_analytics(
    State(state): State<AppState>,
    params: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::ValidationError(e.body_text()))?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let analytics = state
        .backends
        .analytics
        .recent(params.user_id.as_deref(), limit)
        .await
        .map_err(anyhow::Error::from_boxed)?;

    Ok(Json(AnalyticsResponse {
        count: analytics.len(),
        analytics,
    }))
}

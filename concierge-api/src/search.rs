use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use concierge_core::{AIInsightResult, SearchRequest};
use concierge_offer::enrichment::pending_insight;
use concierge_offer::{FlightSearchResponse, RouteInsights};

use crate::error::AppError;
use crate::middleware::ClientInfo;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/search-flights", post(search_flights))
        .route("/api/ai-insights/{search_id}", get(get_ai_insights))
        .route("/api/flight-insights", get(get_flight_insights))
}

#[derive(Debug, Deserialize)]
pub struct FlightInsightsQuery {
    pub source: String,
    pub destination: String,
    pub date: NaiveDate,
    #[serde(default = "default_passengers")]
    pub passengers: u32,
    pub budget: Option<f64>,
}

fn default_passengers() -> u32 {
    1
}

impl FlightInsightsQuery {
    fn into_request(self) -> SearchRequest {
        let mut request = SearchRequest::one_way(&self.source, &self.destination, self.date);
        request.adults = self.passengers;
        request.budget = self.budget;
        request
    }
}

/// POST /api/search-flights
pub async fn search_flights(
    State(state): State<AppState>,
    client: ClientInfo,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<FlightSearchResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::ValidationError(e.body_text()))?;

    info!(
        "Flight search {}-{} on {} from {}",
        request.origin,
        request.destination,
        request.departure_date,
        client.ip_address.as_deref().unwrap_or("unknown")
    );

    let response = state
        .search
        .search(request, client.into_context())
        .await
        .map_err(AppError::from_search)?;

    Ok(Json(response))
}

/// GET /api/ai-insights/{search_id}
///
/// Falls back to a placeholder while nothing is stored for the search.
pub async fn get_ai_insights(
    State(state): State<AppState>,
    search_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<AIInsightResult>, AppError> {
    let Path(search_id) = search_id.map_err(|e| AppError::ValidationError(e.body_text()))?;

    let insight = state
        .search
        .insight(search_id)
        .await
        .map_err(AppError::from_search)?
        .unwrap_or_else(|| pending_insight(search_id));

    Ok(Json(insight))
}

/// GET /api/flight-insights?source=&destination=&date=&passengers=
pub async fn get_flight_insights(
    State(state): State<AppState>,
    params: Result<Query<FlightInsightsQuery>, QueryRejection>,
) -> Result<Json<RouteInsights>, AppError> {
    let Query(params) = params.map_err(|e| AppError::ValidationError(e.body_text()))?;

    let insights = state
        .search
        .route_insights(params.into_request())
        .await
        .map_err(AppError::from_search)?;

    Ok(Json(insights))
}

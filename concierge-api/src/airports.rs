use axum::{extract::Query, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use concierge_core::airports::{search_airports, Airport, PopularRoute, AIRPORTS, POPULAR_ROUTES};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/airports", get(list_airports))
        .route("/api/airports/search", get(find_airports))
        .route("/api/popular-routes", get(popular_routes))
}

#[derive(Debug, Deserialize)]
pub struct AirportQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct AirportList {
    pub airports: Vec<Airport>,
}

#[derive(Debug, Serialize)]
pub struct RouteList {
    pub popular_routes: Vec<PopularRoute>,
}

pub async fn list_airports() -> Json<AirportList> {
    Json(AirportList { airports: AIRPORTS.to_vec() })
}

pub async fn find_airports(Query(params): Query<AirportQuery>) -> Json<AirportList> {
    Json(AirportList { airports: search_airports(&params.query) })
}

pub async fn popular_routes() -> Json<RouteList> {
    Json(RouteList { popular_routes: POPULAR_ROUTES.to_vec() })
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::offer::OfferSource;
use crate::search::{SearchContext, SearchRequest};

/// One row per search, written once after the response is prepared
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchAnalyticsRecord {
    pub search_id: Uuid,
    pub user_id: Option<String>,
    pub search_params: serde_json::Value,
    pub results_count: usize,
    pub search_duration_ms: u64,
    pub cached: bool,
    pub offer_source: OfferSource,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl SearchAnalyticsRecord {
    pub fn new(
        search_id: Uuid,
        request: &SearchRequest,
        context: &SearchContext,
        results_count: usize,
        search_duration_ms: u64,
        offer_source: OfferSource,
    ) -> Self {
        Self {
            search_id,
            user_id: context.user_id.clone().or_else(|| request.user_id.clone()),
            search_params: serde_json::Value::Object(request.search_params()),
            results_count,
            search_duration_ms,
            cached: offer_source == OfferSource::Cache,
            offer_source,
            timestamp: Utc::now(),
            ip_address: context.ip_address.clone(),
            user_agent: context.user_agent.clone(),
        }
    }
}

use async_trait::async_trait;
use uuid::Uuid;

use crate::analytics::SearchAnalyticsRecord;
use crate::insight::AIInsightResult;
use crate::offer::FlightOffer;

pub type RepositoryError = Box<dyn std::error::Error + Send + Sync>;

/// Key-value store for search results with a time-to-live
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Cached offers for `key`, or `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<FlightOffer>>, RepositoryError>;

    /// Upsert offers under `key`, replacing any previous entry
    async fn put(
        &self,
        key: &str,
        offers: &[FlightOffer],
        ttl: chrono::Duration,
    ) -> Result<(), RepositoryError>;

    async fn ping(&self) -> bool;
}

/// Append-only sink for search analytics
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record(&self, record: &SearchAnalyticsRecord) -> Result<(), RepositoryError>;

    /// Most recent records first, optionally restricted to one user
    async fn recent(
        &self,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchAnalyticsRecord>, RepositoryError>;

    async fn ping(&self) -> bool;
}

/// Storage for enrichment results, keyed by search id
#[async_trait]
pub trait InsightStore: Send + Sync {
    async fn save(&self, insight: &AIInsightResult) -> Result<(), RepositoryError>;

    async fn get(&self, search_id: Uuid) -> Result<Option<AIInsightResult>, RepositoryError>;
}

/// Fixed-window request counter
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request against `key`; `Ok(false)` once `limit` is exceeded
    /// within the current window.
    async fn check(&self, key: &str, limit: u64, window_seconds: u64) -> Result<bool, RepositoryError>;
}

use std::sync::Arc;

use tracing::{info, warn};

use concierge_core::repository::{AnalyticsSink, CacheStore, InsightStore, RateLimiter};

use crate::analytics_repo::PostgresAnalyticsRepository;
use crate::app_config::Config;
use crate::database::DbClient;
use crate::insight_repo::PostgresInsightRepository;
use crate::memory::{MemoryAnalyticsSink, MemoryCacheStore, MemoryInsightStore, MemoryRateLimiter};
use crate::redis_repo::RedisClient;

/// The persistence handles the service runs with
#[derive(Clone)]
pub struct Backends {
    pub cache: Arc<dyn CacheStore>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub insights: Arc<dyn InsightStore>,
    pub rate_limiter: Arc<dyn RateLimiter>,
}

impl Backends {
    pub fn in_memory(analytics_capacity: usize, insight_capacity: usize) -> Self {
        Self {
            cache: Arc::new(MemoryCacheStore::new()),
            analytics: Arc::new(MemoryAnalyticsSink::new(analytics_capacity)),
            insights: Arc::new(MemoryInsightStore::new(insight_capacity)),
            rate_limiter: Arc::new(MemoryRateLimiter::new()),
        }
    }

    /// Connect to whatever is configured; anything missing or unreachable
    /// degrades to the in-memory equivalent.
    pub async fn connect(config: &Config) -> Self {
        let mut backends = Self::in_memory(
            config.analytics.memory_capacity,
            config.insights.memory_capacity,
        );

        match config.redis.url.as_deref() {
            Some(url) => match RedisClient::new(url).await {
                Ok(redis) => {
                    if let Err(e) = redis.ping_server().await {
                        warn!("Redis at {} is not answering yet: {}", url, e);
                    }
                    let redis = Arc::new(redis);
                    backends.cache = redis.clone();
                    backends.rate_limiter = redis;
                    info!("Using Redis for the flight cache and rate limits");
                }
                Err(e) => warn!("Invalid Redis URL, using in-memory cache: {}", e),
            },
            None => info!("No Redis configured, using in-memory cache"),
        }

        match config.database.url.as_deref() {
            Some(url) => match DbClient::new(url, config.database.max_connections).await {
                Ok(db) => {
                    if let Err(e) = db.migrate().await {
                        warn!("Database migrations failed: {}", e);
                    }
                    backends.analytics = Arc::new(PostgresAnalyticsRepository::new(db.clone()));
                    backends.insights = Arc::new(PostgresInsightRepository::new(db));
                    info!("Using Postgres for analytics and insights");
                }
                Err(e) => warn!("Database unavailable, analytics kept in memory: {}", e),
            },
            None => info!("No database configured, analytics kept in memory"),
        }

        backends
    }
}

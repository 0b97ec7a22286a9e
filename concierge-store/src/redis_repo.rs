use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use tracing::{debug, info};

use concierge_core::repository::{CacheStore, RateLimiter, RepositoryError};
use concierge_core::{CacheEntry, FlightOffer};

use crate::error::StoreResult;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    fn cache_key(key: &str) -> String {
        format!("flight_cache:{}", key)
    }

    pub async fn get_cache_entry(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(Self::cache_key(key)).await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn set_cache_entry(&self, entry: &CacheEntry) -> StoreResult<()> {
        let ttl_seconds = (entry.expires_at - entry.created_at).num_seconds();
        let key = Self::cache_key(&entry.cache_key);

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        if ttl_seconds <= 0 {
            // Already stale
            conn.del::<_, ()>(key).await?;
            return Ok(());
        }

        let payload = serde_json::to_string(entry)?;
        conn.set_ex::<_, _, ()>(key, payload, ttl_seconds as u64).await?;
        info!("Cached {} offers under {} for {}s", entry.offers.len(), entry.cache_key, ttl_seconds);
        Ok(())
    }

    pub async fn ping_server(&self) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> StoreResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

#[async_trait]
impl CacheStore for RedisClient {
    async fn get(&self, key: &str) -> Result<Option<Vec<FlightOffer>>, RepositoryError> {
        let Some(entry) = self.get_cache_entry(key).await? else {
            return Ok(None);
        };

        // Redis expiry is second-granular; the entry's own timestamp is authoritative
        if !entry.is_fresh(Utc::now()) {
            debug!("Ignoring stale cache entry {}", key);
            return Ok(None);
        }

        Ok(Some(entry.offers))
    }

    async fn put(
        &self,
        key: &str,
        offers: &[FlightOffer],
        ttl: chrono::Duration,
    ) -> Result<(), RepositoryError> {
        let entry = CacheEntry::new(key.to_string(), offers.to_vec(), ttl);
        self.set_cache_entry(&entry).await?;
        Ok(())
    }

    async fn ping(&self) -> bool {
        self.ping_server().await.is_ok()
    }
}

#[async_trait]
impl RateLimiter for RedisClient {
    async fn check(&self, key: &str, limit: u64, window_seconds: u64) -> Result<bool, RepositoryError> {
        let allowed = self
            .check_rate_limit(&format!("ratelimit:{}", key), limit as i64, window_seconds as i64)
            .await?;
        Ok(allowed)
    }
}

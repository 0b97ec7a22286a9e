//! Process-local stores used when Redis or Postgres are not configured.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use concierge_core::repository::{AnalyticsSink, CacheStore, InsightStore, RateLimiter, RepositoryError};
use concierge_core::{AIInsightResult, CacheEntry, FlightOffer, SearchAnalyticsRecord};

/// Stale entries are ignored on read and overwritten on the next put; nothing
/// sweeps them.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<FlightOffer>>, RepositoryError> {
        let now = Utc::now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.offers.clone()))
    }

    async fn put(
        &self,
        key: &str,
        offers: &[FlightOffer],
        ttl: chrono::Duration,
    ) -> Result<(), RepositoryError> {
        let entry = CacheEntry::new(key.to_string(), offers.to_vec(), ttl);
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn ping(&self) -> bool {
        true
    }
}

/// Bounded ring of the most recent analytics records
pub struct MemoryAnalyticsSink {
    records: RwLock<VecDeque<SearchAnalyticsRecord>>,
    capacity: usize,
}

impl MemoryAnalyticsSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl AnalyticsSink for MemoryAnalyticsSink {
    async fn record(&self, record: &SearchAnalyticsRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record.clone());
        Ok(())
    }

    async fn recent(
        &self,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchAnalyticsRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| user_id.is_none() || r.user_id.as_deref() == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> bool {
        true
    }
}

/// Most recent insights keyed by search id; the oldest is evicted at capacity.
pub struct MemoryInsightStore {
    inner: RwLock<InsightRing>,
    capacity: usize,
}

#[derive(Default)]
struct InsightRing {
    by_id: HashMap<Uuid, AIInsightResult>,
    order: VecDeque<Uuid>,
}

impl MemoryInsightStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(InsightRing::default()),
            capacity: capacity.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }
}

#[async_trait]
impl InsightStore for MemoryInsightStore {
    async fn save(&self, insight: &AIInsightResult) -> Result<(), RepositoryError> {
        let mut ring = self.inner.write().await;
        if ring.by_id.insert(insight.search_id, insight.clone()).is_none() {
            ring.order.push_back(insight.search_id);
        }
        while ring.order.len() > self.capacity {
            if let Some(oldest) = ring.order.pop_front() {
                ring.by_id.remove(&oldest);
            }
        }
        Ok(())
    }

    async fn get(&self, search_id: Uuid) -> Result<Option<AIInsightResult>, RepositoryError> {
        Ok(self.inner.read().await.by_id.get(&search_id).cloned())
    }
}

const SWEEP_THRESHOLD: usize = 1024;

/// Fixed windows per key, stored as `(expires_at, count)`.
///
/// Once the map holds more than the sweep threshold, expired windows are
/// dropped before the next key is counted.
pub struct MemoryRateLimiter {
    windows: DashMap<String, (Instant, u64)>,
    sweep_threshold: usize,
}

impl Default for MemoryRateLimiter {
    fn default() -> Self {
        Self::with_sweep_threshold(SWEEP_THRESHOLD)
    }
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_threshold(sweep_threshold: usize) -> Self {
        Self { windows: DashMap::new(), sweep_threshold }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn check(&self, key: &str, limit: u64, window_seconds: u64) -> Result<bool, RepositoryError> {
        let window = Duration::from_secs(window_seconds);
        let now = Instant::now();

        if self.windows.len() > self.sweep_threshold {
            self.windows.retain(|_, (expires_at, _)| *expires_at > now);
        }

        let mut slot = self.windows.entry(key.to_string()).or_insert((now + window, 0));
        if now >= slot.0 {
            *slot = (now + window, 0);
        }
        slot.1 += 1;

        Ok(slot.1 <= limit)
    }
}

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::Row;
use tracing::debug;

use concierge_core::repository::{AnalyticsSink, RepositoryError};
use concierge_core::{OfferSource, SearchAnalyticsRecord};

use crate::database::DbClient;
use crate::error::{StoreError, StoreResult};

pub struct PostgresAnalyticsRepository {
    pub db: DbClient,
}

impl PostgresAnalyticsRepository {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    fn row_to_record(row: &sqlx::postgres::PgRow) -> StoreResult<SearchAnalyticsRecord> {
        let offer_source: String = row.try_get("offer_source")?;
        let offer_source: OfferSource =
            serde_json::from_value(serde_json::Value::String(offer_source.clone()))
                .map_err(|_| StoreError::Corrupt(format!("unknown offer source {}", offer_source)))?;
        let Json(search_params): Json<serde_json::Value> = row.try_get("search_params")?;
        let results_count: i32 = row.try_get("results_count")?;
        let search_duration_ms: i64 = row.try_get("search_duration_ms")?;

        Ok(SearchAnalyticsRecord {
            search_id: row.try_get("search_id")?,
            user_id: row.try_get("user_id")?,
            search_params,
            results_count: results_count.max(0) as usize,
            search_duration_ms: search_duration_ms.max(0) as u64,
            cached: row.try_get("cached")?,
            offer_source,
            timestamp: row.try_get("timestamp")?,
            ip_address: row.try_get("ip_address")?,
            user_agent: row.try_get("user_agent")?,
        })
    }
}

#[async_trait]
impl AnalyticsSink for PostgresAnalyticsRepository {
    async fn record(&self, record: &SearchAnalyticsRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO search_analytics
                (search_id, user_id, search_params, results_count, search_duration_ms,
                 cached, offer_source, timestamp, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.search_id)
        .bind(record.user_id.as_deref())
        .bind(Json(&record.search_params))
        .bind(record.results_count as i32)
        .bind(record.search_duration_ms as i64)
        .bind(record.cached)
        .bind(record.offer_source.as_str())
        .bind(record.timestamp)
        .bind(record.ip_address.as_deref())
        .bind(record.user_agent.as_deref())
        .execute(&self.db.pool)
        .await
        .map_err(StoreError::from)?;

        debug!("Search analytics stored for {}", record.search_id);
        Ok(())
    }

    async fn recent(
        &self,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchAnalyticsRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT search_id, user_id, search_params, results_count, search_duration_ms,
                   cached, offer_source, timestamp, ip_address, user_agent
            FROM search_analytics
            WHERE ($1::TEXT IS NULL OR user_id = $1)
            ORDER BY timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.db.pool)
        .await
        .map_err(StoreError::from)?;

        let records = rows
            .iter()
            .map(Self::row_to_record)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(records)
    }

    async fn ping(&self) -> bool {
        self.db.ping().await
    }
}

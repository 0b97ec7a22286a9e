use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use concierge_core::repository::{InsightStore, RepositoryError};
use concierge_core::{AIInsightResult, InsightSource};

use crate::database::DbClient;
use crate::error::StoreError;

pub struct PostgresInsightRepository {
    pub db: DbClient,
}

impl PostgresInsightRepository {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InsightStore for PostgresInsightRepository {
    async fn save(&self, insight: &AIInsightResult) -> Result<(), RepositoryError> {
        let source = match insight.source {
            InsightSource::Llm => "llm",
            InsightSource::Fallback => "fallback",
        };

        sqlx::query(
            r#"
            INSERT INTO ai_insights (search_id, payload, source, generated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (search_id) DO UPDATE
            SET payload = EXCLUDED.payload,
                source = EXCLUDED.source,
                generated_at = EXCLUDED.generated_at
            "#,
        )
        .bind(insight.search_id)
        .bind(Json(insight))
        .bind(source)
        .bind(insight.generated_at)
        .execute(&self.db.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    async fn get(&self, search_id: Uuid) -> Result<Option<AIInsightResult>, RepositoryError> {
        let row = sqlx::query("SELECT payload FROM ai_insights WHERE search_id = $1")
            .bind(search_id)
            .fetch_optional(&self.db.pool)
            .await
            .map_err(StoreError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let Json(insight): Json<AIInsightResult> = row.try_get("payload").map_err(StoreError::from)?;
        Ok(Some(insight))
    }
}

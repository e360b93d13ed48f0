//! PostgreSQL availability window repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use horae_types::{AvailabilityWindow, UserId, WindowId};

use crate::error::DbResult;
use crate::models::AvailabilityWindowRow;
use crate::repo::{AvailabilityRepository, CreateWindow};

/// PostgreSQL availability window repository
#[derive(Clone)]
pub struct PgAvailabilityRepository {
    pool: PgPool,
}

impl PgAvailabilityRepository {
    /// Create a new availability repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvailabilityRepository for PgAvailabilityRepository {
    async fn create(&self, window: CreateWindow) -> DbResult<AvailabilityWindow> {
        let row = sqlx::query_as::<_, AvailabilityWindowRow>(
            r#"
            INSERT INTO availability_windows (id, provider_id, day_of_week, start_minute, end_minute)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, provider_id, day_of_week, start_minute, end_minute, created_at
            "#,
        )
        .bind(window.id.0)
        .bind(window.provider_id.0)
        .bind(window.day_of_week)
        .bind(i32::from(window.start.as_minutes()))
        .bind(i32::from(window.end.as_minutes()))
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn delete(&self, id: WindowId, provider_id: UserId) -> DbResult<u64> {
        let result =
            sqlx::query("DELETE FROM availability_windows WHERE id = $1 AND provider_id = $2")
                .bind(id.0)
                .bind(provider_id.0)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    async fn find_by_provider(&self, provider_id: UserId) -> DbResult<Vec<AvailabilityWindow>> {
        let rows = sqlx::query_as::<_, AvailabilityWindowRow>(
            r#"
            SELECT id, provider_id, day_of_week, start_minute, end_minute, created_at
            FROM availability_windows
            WHERE provider_id = $1
            ORDER BY day_of_week, start_minute
            "#,
        )
        .bind(provider_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_by_provider_and_day(
        &self,
        provider_id: UserId,
        day_of_week: i16,
    ) -> DbResult<Vec<AvailabilityWindow>> {
        let rows = sqlx::query_as::<_, AvailabilityWindowRow>(
            r#"
            SELECT id, provider_id, day_of_week, start_minute, end_minute, created_at
            FROM availability_windows
            WHERE provider_id = $1 AND day_of_week = $2
            ORDER BY start_minute
            "#,
        )
        .bind(provider_id.0)
        .bind(day_of_week)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

//! PostgreSQL marked moment repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use horae_types::{MarkedMoment, SessionId};

use crate::error::DbResult;
use crate::models::MarkedMomentRow;
use crate::repo::MarkedMomentRepository;

/// PostgreSQL marked moment repository
#[derive(Clone)]
pub struct PgMarkedMomentRepository {
    pool: PgPool,
}

impl PgMarkedMomentRepository {
    /// Create a new marked moment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarkedMomentRepository for PgMarkedMomentRepository {
    async fn replace_for_session(
        &self,
        session_id: SessionId,
        moments: &[MarkedMoment],
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM marked_moments WHERE session_id = $1")
            .bind(session_id.0)
            .execute(&mut *tx)
            .await?;

        for moment in moments {
            sqlx::query(
                r#"
                INSERT INTO marked_moments (id, session_id, timestamp_secs, note)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(session_id.0)
            .bind(moment.timestamp_secs)
            .bind(&moment.note)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_session(&self, session_id: SessionId) -> DbResult<Vec<MarkedMoment>> {
        let rows = sqlx::query_as::<_, MarkedMomentRow>(
            r#"
            SELECT id, session_id, timestamp_secs, note
            FROM marked_moments
            WHERE session_id = $1
            ORDER BY timestamp_secs
            "#,
        )
        .bind(session_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MarkedMoment::from).collect())
    }

    async fn delete_for_session(&self, session_id: SessionId) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM marked_moments WHERE session_id = $1")
            .bind(session_id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

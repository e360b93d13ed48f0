//! PostgreSQL consent repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use horae_types::{ConsentKind, SessionId, UserId};

use crate::error::{DbError, DbResult};
use crate::repo::ConsentRepository;

/// PostgreSQL consent repository
#[derive(Clone)]
pub struct PgConsentRepository {
    pool: PgPool,
}

impl PgConsentRepository {
    /// Create a new consent repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConsentRepository for PgConsentRepository {
    async fn grant(
        &self,
        session_id: SessionId,
        user_id: UserId,
        kind: ConsentKind,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO consents (id, session_id, user_id, kind)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (session_id, user_id, kind) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session_id.0)
        .bind(user_id.0)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn kinds_for(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> DbResult<Vec<ConsentKind>> {
        let kinds = sqlx::query_scalar::<_, String>(
            "SELECT kind FROM consents WHERE session_id = $1 AND user_id = $2",
        )
        .bind(session_id.0)
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        kinds
            .iter()
            .map(|k| k.parse().map_err(|e: horae_types::ParseConsentKindError| {
                DbError::Corrupt(e.to_string())
            }))
            .collect()
    }

    async fn delete_for_session(&self, session_id: SessionId) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM consents WHERE session_id = $1")
            .bind(session_id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

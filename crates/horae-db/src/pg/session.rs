//! PostgreSQL session repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use horae_types::{BookingId, Session, SessionId, SessionStatus};

use crate::error::{DbError, DbResult};
use crate::models::SessionRow;
use crate::repo::{AudioMetadata, CreateSession, SessionRepository};

/// PostgreSQL session repository
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session: CreateSession) -> DbResult<Session> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (id, booking_id)
            VALUES ($1, $2)
            RETURNING id, booking_id, status, status_message, audio_url, audio_size_bytes,
                      audio_duration_secs, audio_format, transcript, summary_raw, summary_final,
                      uploaded_at, transcribed_at, completed_at, created_at, updated_at
            "#,
        )
        .bind(session.id.0)
        .bind(session.booking_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from_sqlx)?;

        row.try_into()
    }

    async fn find_by_id(&self, id: SessionId) -> DbResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, booking_id, status, status_message, audio_url, audio_size_bytes,
                   audio_duration_secs, audio_format, transcript, summary_raw, summary_final,
                   uploaded_at, transcribed_at, completed_at, created_at, updated_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Session::try_from).transpose()
    }

    async fn find_by_booking(&self, booking_id: BookingId) -> DbResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, booking_id, status, status_message, audio_url, audio_size_bytes,
                   audio_duration_secs, audio_format, transcript, summary_raw, summary_final,
                   uploaded_at, transcribed_at, completed_at, created_at, updated_at
            FROM sessions
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Session::try_from).transpose()
    }

    async fn update_status(
        &self,
        id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(to.as_str())
        .bind(id.0)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_failed(
        &self,
        id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
        message: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET status = $1, status_message = $2, updated_at = NOW()
            WHERE id = $3 AND status = $4
            "#,
        )
        .bind(to.as_str())
        .bind(message)
        .bind(id.0)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_audio(
        &self,
        id: SessionId,
        audio: AudioMetadata,
        uploaded_at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET audio_url = $1, audio_size_bytes = $2, audio_duration_secs = $3,
                audio_format = $4, uploaded_at = $5, updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(&audio.url)
        .bind(audio.size_bytes)
        .bind(audio.duration_secs)
        .bind(&audio.format)
        .bind(uploaded_at)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_transcript(
        &self,
        id: SessionId,
        transcript: &str,
        transcribed_at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET transcript = $1, transcribed_at = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(transcript)
        .bind(transcribed_at)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_summary_raw(&self, id: SessionId, summary: &str) -> DbResult<()> {
        sqlx::query("UPDATE sessions SET summary_raw = $1, updated_at = NOW() WHERE id = $2")
            .bind(summary)
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn complete(
        &self,
        id: SessionId,
        from: SessionStatus,
        completed_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET status = 'completed', status_message = NULL, completed_at = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            "#,
        )
        .bind(completed_at)
        .bind(id.0)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_summary_final(&self, id: SessionId, summary: &str) -> DbResult<()> {
        sqlx::query("UPDATE sessions SET summary_final = $1, updated_at = NOW() WHERE id = $2")
            .bind(summary)
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn reset(&self, id: SessionId) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET status = 'idle', status_message = NULL, audio_url = NULL,
                audio_size_bytes = NULL, audio_duration_secs = NULL, audio_format = NULL,
                transcript = NULL, summary_raw = NULL, summary_final = NULL,
                uploaded_at = NULL, transcribed_at = NULL, completed_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

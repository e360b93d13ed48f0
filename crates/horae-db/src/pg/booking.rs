//! PostgreSQL booking repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use horae_types::{Booking, BookingId, BookingStatus, UserId};

use crate::error::{DbError, DbResult};
use crate::models::BookingRow;
use crate::repo::{BookingRepository, CreateBooking};

/// PostgreSQL booking repository
#[derive(Clone)]
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    /// Create a new booking repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create(&self, booking: CreateBooking) -> DbResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            INSERT INTO bookings (id, client_id, provider_id, scheduled_at, duration_minutes,
                                  mode, location, price_cents, currency)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, client_id, provider_id, scheduled_at, duration_minutes, mode, location,
                      price_cents, currency, status, payment_session_id, payment_intent_id,
                      paid_at, cancelled_at, cancelled_by, cancel_reason, refunded_at,
                      created_at, updated_at
            "#,
        )
        .bind(booking.id.0)
        .bind(booking.client_id.0)
        .bind(booking.provider_id.0)
        .bind(booking.scheduled_at)
        .bind(booking.duration_minutes)
        .bind(booking.mode.as_str())
        .bind(&booking.location)
        .bind(booking.price_cents)
        .bind(&booking.currency)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from_sqlx)?;

        row.try_into()
    }

    async fn find_by_id(&self, id: BookingId) -> DbResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, client_id, provider_id, scheduled_at, duration_minutes, mode, location,
                   price_cents, currency, status, payment_session_id, payment_intent_id,
                   paid_at, cancelled_at, cancelled_by, cancel_reason, refunded_at,
                   created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn find_by_payment_intent(&self, payment_intent_id: &str) -> DbResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, client_id, provider_id, scheduled_at, duration_minutes, mode, location,
                   price_cents, currency, status, payment_session_id, payment_intent_id,
                   paid_at, cancelled_at, cancelled_by, cancel_reason, refunded_at,
                   created_at, updated_at
            FROM bookings
            WHERE payment_intent_id = $1
            "#,
        )
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn slot_holding_starts(
        &self,
        provider_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<DateTime<Utc>>> {
        let starts = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT scheduled_at
            FROM bookings
            WHERE provider_id = $1
              AND scheduled_at >= $2
              AND scheduled_at < $3
              AND status IN ('pending', 'confirmed')
            ORDER BY scheduled_at
            "#,
        )
        .bind(provider_id.0)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(starts)
    }

    async fn update_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE bookings SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(to.as_str())
        .bind(id.0)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_payment_session(&self, id: BookingId, session_id: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE bookings SET payment_session_id = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(session_id)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn confirm_payment(
        &self,
        id: BookingId,
        from: BookingStatus,
        payment_session_id: &str,
        payment_intent_id: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'confirmed', payment_session_id = $1, payment_intent_id = $2,
                paid_at = $3, updated_at = NOW()
            WHERE id = $4 AND status = $5
            "#,
        )
        .bind(payment_session_id)
        .bind(payment_intent_id)
        .bind(paid_at)
        .bind(id.0)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_cancellation(
        &self,
        id: BookingId,
        from: BookingStatus,
        cancelled_by: UserId,
        reason: Option<&str>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'cancelled', cancelled_at = NOW(), cancelled_by = $1,
                cancel_reason = $2, updated_at = NOW()
            WHERE id = $3 AND status = $4
            "#,
        )
        .bind(cancelled_by.0)
        .bind(reason)
        .bind(id.0)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_refund(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        refunded_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $1, refunded_at = $2, updated_at = NOW()
            WHERE id = $3 AND status = $4
            "#,
        )
        .bind(to.as_str())
        .bind(refunded_at)
        .bind(id.0)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_refunded_at(&self, id: BookingId, refunded_at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE bookings SET refunded_at = $1, updated_at = NOW() WHERE id = $2")
            .bind(refunded_at)
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

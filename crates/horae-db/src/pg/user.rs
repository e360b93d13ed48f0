//! PostgreSQL user repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use horae_types::{ProviderProfile, User, UserId};

use crate::error::DbResult;
use crate::models::{ProviderProfileRow, UserRow};
use crate::repo::UserRepository;

/// PostgreSQL user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: UserId) -> DbResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, role, display_name, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_provider(&self, id: UserId) -> DbResult<Option<ProviderProfile>> {
        let row = sqlx::query_as::<_, ProviderProfileRow>(
            r#"
            SELECT user_id, verified, hourly_rate_cents, currency
            FROM provider_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProviderProfile::from))
    }
}

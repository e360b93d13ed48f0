//! Database errors

use thiserror::Error;

/// Result alias for database operations
pub type DbResult<T> = Result<T, DbError>;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Insert or update violated a uniqueness constraint
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A stored value falls outside the domain model
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl DbError {
    /// Whether this error is a uniqueness-constraint violation
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Map a raw sqlx error, turning unique-constraint violations into
    /// [`DbError::UniqueViolation`]
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            if db.is_unique_violation() {
                let constraint = db.constraint().unwrap_or("unknown").to_string();
                return Self::UniqueViolation(constraint);
            }
        }
        Self::Sqlx(err)
    }
}

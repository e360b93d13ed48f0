//! Horae DB - Database abstractions
//!
//! SQLx-based database layer for Horae services. Repository traits
//! speak the typed domain model from `horae-types`; the PostgreSQL
//! implementations own the row mapping and reject rows whose status
//! strings fall outside the closed domain enums.
//!
//! # Example
//!
//! ```rust,ignore
//! use horae_db::{create_pool, run_migrations, Repositories};
//!
//! let pool = create_pool("postgres://localhost/horae").await?;
//! run_migrations(&pool).await?;
//! let repos = Repositories::new(pool);
//!
//! let booking = repos.bookings.find_by_id(booking_id).await?;
//! ```

pub mod error;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, run_migrations, DbPool};
pub use repo::*;

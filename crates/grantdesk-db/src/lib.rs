//! GrantDesk DB - Repository layer for MySQL.
//!
//! # Overview
//!
//! One repository per aggregate, each a cheap `Clone` around a [`MySqlPool`]:
//! - [`UserRepository`] - accounts and departments
//! - [`SessionRepository`] - login sessions (hashed tokens)
//! - [`YearRepository`] - budget years
//! - [`FundRepository`] - fund categories, subcategories and budget lines
//! - [`RequestRepository`] - fund requests and their reviews
//! - [`AnnouncementRepository`] - portal announcements
//! - [`PublicationRepository`] - imported publications, implements
//!   [`grantdesk_core::PublicationStore`]
//!
//! [`migrations::run`] creates the schema.

mod announcement_repository;
mod fund_repository;
pub mod migrations;
mod publication_repository;
mod request_repository;
mod session_repository;
mod user_repository;
mod year_repository;

pub use announcement_repository::AnnouncementRepository;
pub use fund_repository::{FundRepository, FundTreeRows};
pub use publication_repository::{PublicationRepository, PublicationStats};
pub use request_repository::{RequestFilter, RequestRepository};
pub use session_repository::SessionRepository;
pub use user_repository::UserRepository;
pub use year_repository::YearRepository;

use grantdesk_core::AppError;
use sqlx::MySqlPool;

/// Checks database connectivity.
pub async fn health_check(pool: &MySqlPool) -> Result<(), AppError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Maps a unique-key violation to `Conflict`, anything else to `DatabaseError`.
pub(crate) fn conflict_on_duplicate(e: sqlx::Error, message: impl Into<String>) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AppError::Conflict(message.into());
        }
    }
    AppError::DatabaseError(e)
}

/// Maps a foreign-key violation to `Conflict`, anything else to `DatabaseError`.
pub(crate) fn conflict_on_reference(e: sqlx::Error, message: impl Into<String>) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() {
            return AppError::Conflict(message.into());
        }
    }
    AppError::DatabaseError(e)
}

/// `LAST_INSERT_ID()` as the signed id type used everywhere else.
pub(crate) fn inserted_id(result: &sqlx::mysql::MySqlQueryResult) -> i64 {
    i64::try_from(result.last_insert_id()).unwrap_or(i64::MAX)
}

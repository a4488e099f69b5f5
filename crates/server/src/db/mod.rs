//! Database operations for the directory `PostgreSQL` database.
//!
//! # Tables
//!
//! - `app_user` - registered users (reset token lives here too)
//! - `user_password` - argon2 hashes, one row per user, owned by the auth service
//! - `store` - the directory entries (slug, tags, location, photo, author)
//! - `review` - store reviews (author resolved eagerly on every read)
//! - `heart` - user/store favorites, primary key enforces set semantics
//! - `tower_sessions.session` - created by the session store on startup
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and are embedded with
//! `sqlx::migrate!`; `main` runs them on startup.

pub mod reviews;
pub mod stores;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The row being updated does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value no longer parses as its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

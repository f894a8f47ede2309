//! Persistence gateway for the insurance risk pipeline.
//!
//! Every query function takes a `&mut SqliteConnection` so callers decide the
//! transaction boundary: pass `&mut *tx` to take part in a unit of work, or a
//! pooled connection for standalone reads.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

mod adjustment;
mod customer;
mod event;
mod model;
mod report;
mod score;
mod text;

pub use adjustment::*;
pub use customer::*;
pub use event::*;
pub use model::*;
pub use report::*;
pub use risk_structs::*;
pub use score::*;
pub use text::*;

/// Creates a connection pool to the `SQLite` database.
///
/// The pipeline works over a single connection per process, so the pool is
/// capped at one connection.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the connection fails.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
}

/// Creates a pool over a private in-memory database.
///
/// The single connection is never recycled, since dropping it would discard
/// the database.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

/// Runs all pending migrations.
///
/// # Errors
///
/// Returns an error if running migrations fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

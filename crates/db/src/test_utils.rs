//! Test utilities for database operations.
//!
//! Provides an in-memory `SQLite` database with migrations applied, so store
//! and coordinator tests run against real SQL without external services.

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::debug;

use crate::migrations::Migrator;

/// URL of a private in-memory `SQLite` database.
pub const MEMORY_URL: &str = "sqlite::memory:";

/// Open an in-memory database and run all migrations.
///
/// The pool is pinned to a single connection: every `SQLite` in-memory
/// connection is its own database.
pub async fn memory_db() -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(MEMORY_URL);
    opt.max_connections(1)
        .min_connections(1)
        .idle_timeout(std::time::Duration::from_secs(3600))
        .sqlx_logging(false);

    let conn = Database::connect(opt).await?;
    Migrator::up(&conn, None).await?;

    debug!("Created in-memory test database");
    Ok(conn)
}

//! Database layer (SQLite).
//!
//! Connections are opened with foreign keys enabled and all schema
//! migrations applied. The applied version is tracked in `PRAGMA user_version`.

pub mod sqlite;

pub use sqlite::SqliteDb;

use crate::error::AppError;
use rusqlite::Connection;

/// A schema migration, applied in ascending `version` order.
#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("migrations/0001_init.sql"),
}];

/// Latest schema version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Apply all pending migrations in a single transaction.
pub fn apply_migrations(conn: &mut Connection) -> Result<(), AppError> {
    let current: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let latest = latest_version();

    if current > latest {
        return Err(AppError::Database(format!(
            "database schema version {} is newer than supported {}",
            current, latest
        )));
    }

    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        tracing::info!(version = migration.version, "Applied schema migration");
    }
    tx.commit()?;

    Ok(())
}

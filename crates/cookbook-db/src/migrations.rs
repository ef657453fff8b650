//! Schema setup for the recipe store.
//!
//! The schema version lives in SQLite's `user_version` header field. Step
//! `n` of [`SCHEMA`] upgrades a database from version `n` to `n + 1`; a
//! fresh file starts at 0. Steps only ever create, never drop.

use rusqlite::Connection;
use thiserror::Error;

/// Ordered schema steps as `(name, sql)`.
const SCHEMA: &[(&str, &str)] = &[("recipes", include_str!("migrations/000_recipes.sql"))];

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("schema step {version} ({name}) failed: {source}")]
    Step {
        version: usize,
        name: &'static str,
        source: rusqlite::Error,
    },

    #[error("could not read schema version: {0}")]
    ReadVersion(rusqlite::Error),

    /// The file was written by a newer build that knows more steps.
    #[error("database schema version {found} is newer than this build ({known})")]
    TooNew { found: usize, known: usize },
}

/// Brings the schema up to date and returns how many steps ran.
///
/// Safe to call on every start: an up-to-date database is left untouched.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply(conn, SCHEMA)
}

/// The schema version this build creates.
pub fn schema_version() -> usize {
    SCHEMA.len()
}

fn apply(conn: &Connection, steps: &[(&'static str, &'static str)]) -> Result<usize, MigrationError> {
    let current: usize = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(MigrationError::ReadVersion)?;

    if current > steps.len() {
        return Err(MigrationError::TooNew {
            found: current,
            known: steps.len(),
        });
    }

    for (version, (name, sql)) in steps.iter().enumerate().skip(current) {
        let name = *name;
        let step = |source| MigrationError::Step {
            version,
            name,
            source,
        };

        // user_version is part of the database header, so it commits or
        // rolls back together with the step's DDL.
        let tx = conn.unchecked_transaction().map_err(step)?;
        tx.execute_batch(sql).map_err(step)?;
        tx.pragma_update(None, "user_version", version + 1)
            .map_err(step)?;
        tx.commit().map_err(step)?;

        tracing::info!(version = version + 1, step = name, "schema step applied");
    }

    Ok(steps.len() - current)
}

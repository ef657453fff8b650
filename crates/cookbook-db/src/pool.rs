//! Connection pool and write-transaction discipline for the recipe store.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Duration;
use thiserror::Error;

/// Path that opens a private in-memory database.
const IN_MEMORY: &str = ":memory:";

/// Pool sizing and lock-wait tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// How long a writer waits for the database lock before failing.
    /// Concurrent view increments queue on this timeout.
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            max_connections: 8,
        }
    }
}

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to open recipe store at '{path}': {source}")]
    Open { path: String, source: r2d2::Error },
}

/// Opens a pool over the SQLite file at `path`.
///
/// File databases run in WAL mode so listing never waits on a view
/// increment. `:memory:` gives every connection its own database, so such a
/// pool is capped at one connection.
pub fn create_pool(path: &str, settings: PoolSettings) -> Result<DbPool, PoolError> {
    let busy_timeout = settings.busy_timeout;
    let manager = SqliteConnectionManager::file(path)
        .with_init(move |conn| tune_connection(conn, busy_timeout));

    let max_size = if path == IN_MEMORY {
        1
    } else {
        settings.max_connections.max(1)
    };

    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|source| PoolError::Open {
            path: path.to_string(),
            source,
        })?;

    tracing::debug!(path, max_size, "recipe store pool opened");
    Ok(pool)
}

fn tune_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if mode == "wal" {
        // WAL commits are durable across process crashes with NORMAL.
        conn.pragma_update(None, "synchronous", "NORMAL")?;
    }
    Ok(())
}

/// Begins a transaction that takes the write lock up front.
///
/// Read-modify-write sequences must use this rather than a deferred
/// transaction: two deferred readers that both try to upgrade deadlock and
/// one of them fails with `SQLITE_BUSY` instead of waiting.
pub fn begin_write(conn: &mut Connection) -> rusqlite::Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_pool_uses_wal_and_configured_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.db");
        let settings = PoolSettings {
            busy_timeout: Duration::from_millis(2_500),
            max_connections: 3,
        };

        let pool = create_pool(path.to_str().unwrap(), settings).unwrap();
        assert_eq!(pool.max_size(), 3);

        let conn = pool.get().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 2_500);
    }

    #[test]
    fn in_memory_pool_is_single_connection() {
        let pool = create_pool(IN_MEMORY, PoolSettings::default()).unwrap();
        assert_eq!(pool.max_size(), 1);
    }

    #[test]
    fn begin_write_holds_the_lock_against_other_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lock.db");
        let settings = PoolSettings {
            busy_timeout: Duration::from_millis(50),
            max_connections: 2,
        };
        let pool = create_pool(path.to_str().unwrap(), settings).unwrap();

        let mut first = pool.get().unwrap();
        let mut second = pool.get().unwrap();
        let held = begin_write(&mut first).unwrap();

        let err = begin_write(&mut second).expect_err("second writer should time out");
        assert_eq!(err.sqlite_error_code(), Some(rusqlite::ErrorCode::DatabaseBusy));

        held.commit().unwrap();
        begin_write(&mut second).expect("lock is free after commit");
    }
}

//! Storage plumbing for the recipe store: an `r2d2` pool of SQLite
//! connections, the write-transaction helper that view counting relies on,
//! and the embedded schema.

mod migrations;
mod pool;

pub use migrations::{run_migrations, schema_version, MigrationError};
pub use pool::{begin_write, create_pool, DbPool, PoolError, PoolSettings};

//! SQLite storage bootstrap, schema migrations and connection pooling.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the dictionary store.
//! - Apply schema migrations in deterministic order.
//! - Hand out connections to concurrent callers, one per transaction.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No dictionary data is read or written before migrations succeed.
//! - Every returned connection has `foreign_keys=ON` so cascades fire.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub mod migrations;
mod open;
pub mod pool;

pub use open::{
    clamp_busy_timeout, open_db, open_db_in_memory, DEFAULT_BUSY_TIMEOUT, MAX_BUSY_TIMEOUT,
};
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// No pooled connection became free within the acquire timeout.
    PoolTimeout { waited: Duration },
    /// A thread panicked while holding the pool bookkeeping lock.
    PoolPoisoned,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::PoolTimeout { waited } => write!(
                f,
                "no database connection available after {} ms",
                waited.as_millis()
            ),
            Self::PoolPoisoned => write!(f, "connection pool state is poisoned"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::PoolTimeout { .. } => None,
            Self::PoolPoisoned => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

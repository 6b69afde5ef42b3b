//! Bounded connection pool shared by concurrent service callers.
//!
//! # Responsibility
//! - Open file connections lazily up to `max_size`.
//! - Give each transaction exclusive use of one connection.
//! - Block callers until a connection frees up or `acquire_timeout` passes.
//!
//! # Invariants
//! - A connection is owned by at most one `PooledConnection` at a time.
//! - Connections returned outside autocommit state are discarded, never reused.
//! - In-memory pools hold exactly one connection; the database lives in it.

use super::open::{clamp_busy_timeout, open_db, open_db_in_memory, DEFAULT_BUSY_TIMEOUT};
use super::{DbError, DbResult};
use log::{debug, warn};
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Sizing and timeout policy for a [`ConnectionPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound of simultaneously open connections. Default: 8
    pub max_size: usize,
    /// How long `acquire` waits for a free connection. Default: 30s
    pub acquire_timeout: Duration,
    /// SQLite busy timeout applied to every connection. Default: 5s
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub const fn max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    #[must_use]
    pub const fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Values above SQLite's limit are capped at `MAX_BUSY_TIMEOUT`.
    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = clamp_busy_timeout(timeout);
        self
    }
}

#[derive(Debug)]
enum PoolSource {
    File(PathBuf),
    Memory,
}

struct PoolState {
    idle: Vec<Connection>,
    open: usize,
}

/// Pool of migrated SQLite connections.
pub struct ConnectionPool {
    source: PoolSource,
    config: PoolConfig,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl ConnectionPool {
    /// Opens a pool over a database file.
    ///
    /// The first connection is opened eagerly so migration and bootstrap
    /// failures surface here rather than on first use.
    pub fn open(path: impl AsRef<Path>, config: PoolConfig) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let first = open_db(&path, config.busy_timeout)?;
        let config = config.max_size(config.max_size.max(1));
        debug!(
            "event=pool_open module=pool status=ok mode=file max_size={}",
            config.max_size
        );
        Ok(Self {
            source: PoolSource::File(path),
            config,
            state: Mutex::new(PoolState {
                idle: vec![first],
                open: 1,
            }),
            available: Condvar::new(),
        })
    }

    /// Opens a single-connection pool over a private in-memory database.
    pub fn in_memory() -> DbResult<Self> {
        Self::in_memory_with(PoolConfig::default())
    }

    /// Same as [`ConnectionPool::in_memory`] with explicit timeouts.
    /// `max_size` is forced to 1.
    pub fn in_memory_with(config: PoolConfig) -> DbResult<Self> {
        let conn = open_db_in_memory()?;
        conn.busy_timeout(clamp_busy_timeout(config.busy_timeout))?;
        debug!("event=pool_open module=pool status=ok mode=memory max_size=1");
        Ok(Self {
            source: PoolSource::Memory,
            config: config.max_size(1),
            state: Mutex::new(PoolState {
                idle: vec![conn],
                open: 1,
            }),
            available: Condvar::new(),
        })
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Returns `true` when the pool is backed by a database file.
    pub fn is_file_backed(&self) -> bool {
        matches!(self.source, PoolSource::File(_))
    }

    /// Takes a connection, opening a new one if below `max_size`, otherwise
    /// waiting up to `acquire_timeout` for one to be released.
    pub fn acquire(&self) -> DbResult<PooledConnection<'_>> {
        let started_at = Instant::now();
        let deadline = started_at + self.config.acquire_timeout;
        let mut state = self.lock_state()?;

        loop {
            if let Some(conn) = state.idle.pop() {
                return Ok(PooledConnection::new(self, conn));
            }

            // In-memory pools start full, so only file pools reach this branch.
            if state.open < self.config.max_size {
                state.open += 1;
                drop(state);
                return match self.open_connection() {
                    Ok(conn) => Ok(PooledConnection::new(self, conn)),
                    Err(err) => {
                        self.forget_connection();
                        Err(err)
                    }
                };
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "event=pool_acquire module=pool status=error error_code=pool_timeout waited_ms={}",
                    started_at.elapsed().as_millis()
                );
                return Err(DbError::PoolTimeout {
                    waited: started_at.elapsed(),
                });
            }

            let (guard, _) = self
                .available
                .wait_timeout(state, deadline - now)
                .map_err(|_| DbError::PoolPoisoned)?;
            state = guard;
        }
    }

    fn open_connection(&self) -> DbResult<Connection> {
        match &self.source {
            PoolSource::File(path) => open_db(path, self.config.busy_timeout),
            PoolSource::Memory => open_db_in_memory(),
        }
    }

    fn lock_state(&self) -> DbResult<MutexGuard<'_, PoolState>> {
        self.state.lock().map_err(|_| DbError::PoolPoisoned)
    }

    fn release(&self, conn: Connection) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if conn.is_autocommit() {
            state.idle.push(conn);
        } else {
            warn!("event=pool_release module=pool status=error error_code=open_transaction_discarded");
            state.open = state.open.saturating_sub(1);
        }
        drop(state);
        self.available.notify_one();
    }

    fn forget_connection(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.open = state.open.saturating_sub(1);
        drop(state);
        self.available.notify_one();
    }
}

/// Connection checked out of a [`ConnectionPool`]; returned on drop.
pub struct PooledConnection<'pool> {
    pool: &'pool ConnectionPool,
    conn: Option<Connection>,
}

impl<'pool> PooledConnection<'pool> {
    fn new(pool: &'pool ConnectionPool, conn: Connection) -> Self {
        Self {
            pool,
            conn: Some(conn),
        }
    }
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
            .as_ref()
            .expect("pooled connection is present until drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn
            .as_mut()
            .expect("pooled connection is present until drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

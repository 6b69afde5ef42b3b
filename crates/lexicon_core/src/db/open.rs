//! SQLite connection bootstrap.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections wait at most `busy_timeout` for a lock, capped at
//!   [`MAX_BUSY_TIMEOUT`].
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Lock wait applied when the caller does not configure one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest lock wait SQLite accepts (`i32::MAX` milliseconds).
pub const MAX_BUSY_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

#[derive(Clone, Copy)]
enum Target<'a> {
    File(&'a Path),
    Memory,
}

impl Target<'_> {
    fn label(self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// File databases are switched to WAL so lookups do not block behind the
/// single writer.
pub fn open_db(path: impl AsRef<Path>, busy_timeout: Duration) -> DbResult<Connection> {
    open_target(Target::File(path.as_ref()), busy_timeout)
}

/// Opens an in-memory SQLite database and applies all pending migrations.
///
/// The database lives and dies with the returned connection.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_target(Target::Memory, DEFAULT_BUSY_TIMEOUT)
}

/// Clamps `timeout` into the range SQLite's busy handler accepts.
pub const fn clamp_busy_timeout(timeout: Duration) -> Duration {
    if timeout.as_millis() > MAX_BUSY_TIMEOUT.as_millis() {
        MAX_BUSY_TIMEOUT
    } else {
        timeout
    }
}

fn open_target(target: Target<'_>, busy_timeout: Duration) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = target.label();
    info!("event=db_open module=db status=start mode={mode}");

    let result = connect(target).and_then(|mut conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(clamp_busy_timeout(busy_timeout))?;
        apply_migrations(&mut conn)?;
        if let Target::File(_) = target {
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
        }
        Ok(conn)
    });

    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!("event=db_open module=db status=ok mode={mode} duration_ms={duration_ms}"),
        Err(err) => error!(
            "event=db_open module=db status=error mode={mode} duration_ms={duration_ms} error={err}"
        ),
    }
    result
}

fn connect(target: Target<'_>) -> DbResult<Connection> {
    let conn = match target {
        Target::File(path) => Connection::open(path)?,
        Target::Memory => Connection::open_in_memory()?,
    };
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::{clamp_busy_timeout, open_db, MAX_BUSY_TIMEOUT};
    use std::time::Duration;

    #[test]
    fn clamp_busy_timeout_caps_values_sqlite_cannot_hold() {
        assert_eq!(
            clamp_busy_timeout(Duration::from_millis(3_000_000_000)),
            MAX_BUSY_TIMEOUT
        );
        assert_eq!(
            clamp_busy_timeout(Duration::from_millis(250)),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn open_db_accepts_an_oversized_busy_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_db(dir.path().join("long_wait.db"), Duration::MAX).unwrap();
        let words: i64 = conn
            .query_row("SELECT COUNT(*) FROM words;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(words, 0);
    }
}

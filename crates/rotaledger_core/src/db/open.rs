//! Connection bootstrap utilities for tenant stores.
//!
//! # Responsibility
//! - Open file-backed, read-only, or in-memory SQLite connections.
//! - Configure pragmas required by the ledger (foreign keys, busy timeout,
//!   WAL for file stores).
//! - Verify integrity and migrate before returning a usable connection.
//!
//! # Invariants
//! - Returned writer connections have `foreign_keys=ON` and the latest schema.
//! - Reader connections are opened only after a writer has migrated the file.

use super::migrations::{apply_migrations, ensure_schema_ready};
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

/// Pragmas and checks applied to every tenant connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// SQLite `busy_timeout` for file-lock contention.
    pub busy_timeout: Duration,
    /// Run `PRAGMA quick_check` before migrating.
    pub verify_integrity: bool,
    /// Switch file stores to WAL so readers do not block the writer.
    pub wal: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            verify_integrity: true,
            wal: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum OpenMode {
    File,
    Reader,
    Memory,
}

impl OpenMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Reader => "reader",
            Self::Memory => "memory",
        }
    }
}

/// Opens (creating if missing) a tenant database file and migrates it.
///
/// # Side effects
/// - Creates the file when absent.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>, options: &ConnectionOptions) -> DbResult<Connection> {
    let path = path.as_ref();
    open_with(OpenMode::File, options, || Connection::open(path))
}

/// Opens a read-only connection to an already migrated tenant file.
pub fn open_db_reader(
    path: impl AsRef<Path>,
    options: &ConnectionOptions,
) -> DbResult<Connection> {
    let path = path.as_ref();
    open_with(OpenMode::Reader, options, || {
        Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    })
}

/// Opens a private in-memory database and migrates it.
pub fn open_db_in_memory(options: &ConnectionOptions) -> DbResult<Connection> {
    open_with(OpenMode::Memory, options, Connection::open_in_memory)
}

fn open_with(
    mode: OpenMode,
    options: &ConnectionOptions,
    opener: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={}", mode.as_str());

    let result = opener()
        .map_err(DbError::from)
        .and_then(|mut conn| bootstrap_connection(&mut conn, mode, options).map(|()| conn));

    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} duration_ms={}",
            mode.as_str(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} corrupt={} error={}",
            mode.as_str(),
            started_at.elapsed().as_millis(),
            err.is_corruption(),
            err
        ),
    }
    result
}

fn bootstrap_connection(
    conn: &mut Connection,
    mode: OpenMode,
    options: &ConnectionOptions,
) -> DbResult<()> {
    conn.busy_timeout(options.busy_timeout)?;

    if matches!(mode, OpenMode::Reader) {
        // Reads the header, so a foreign file fails here rather than later.
        conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
        return ensure_schema_ready(conn);
    }

    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    if matches!(mode, OpenMode::File) && options.wal {
        conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get::<_, String>(0))?;
    }
    if options.verify_integrity {
        quick_check(conn)?;
    }
    apply_migrations(conn)?;
    ensure_schema_ready(conn)
}

fn quick_check(conn: &Connection) -> DbResult<()> {
    let verdict: String = conn.query_row("PRAGMA quick_check;", [], |row| row.get(0))?;
    if verdict.eq_ignore_ascii_case("ok") {
        Ok(())
    } else {
        Err(DbError::IntegrityCheckFailed(verdict))
    }
}

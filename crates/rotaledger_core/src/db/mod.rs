//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure one SQLite database per tenant.
//! - Apply schema migrations in deterministic order.
//! - Classify SQLite failures into contention vs corruption.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - A connection is never handed out before migrations and the schema
//!   readiness check succeed.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_db_reader, ConnectionOptions};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// `PRAGMA quick_check` reported a problem.
    IntegrityCheckFailed(String),
    /// A migrated store lacks a table the core depends on.
    MissingRequiredTable(&'static str),
    /// The tenant writer could not be acquired in time.
    LockTimeout { waited_ms: u128 },
}

impl DbError {
    /// Transient lock contention that may succeed on retry.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Sqlite(err) => matches!(
                err.sqlite_error_code(),
                Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }

    /// The store exists but cannot be trusted or read.
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::Sqlite(err) => matches!(
                err.sqlite_error_code(),
                Some(ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
            ),
            Self::UnsupportedSchemaVersion { .. }
            | Self::IntegrityCheckFailed(_)
            | Self::MissingRequiredTable(_) => true,
            Self::Io(_) | Self::LockTimeout { .. } => false,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "storage i/o failed: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::IntegrityCheckFailed(detail) => {
                write!(f, "database integrity check failed: {detail}")
            }
            Self::MissingRequiredTable(table) => {
                write!(f, "database is missing required table `{table}`")
            }
            Self::LockTimeout { waited_ms } => {
                write!(f, "timed out after {waited_ms}ms waiting for tenant store")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::IntegrityCheckFailed(_)
            | Self::MissingRequiredTable(_)
            | Self::LockTimeout { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

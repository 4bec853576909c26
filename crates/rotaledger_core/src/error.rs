//! Error taxonomy for ledger operations.
//!
//! # Responsibility
//! - Give every failure one semantic variant that callers can match on.
//! - Map variants onto the coarse [`ErrorKind`] taxonomy used at the
//!   request-handling boundary.
//!
//! # Invariants
//! - Errors are never swallowed: every storage failure surfaces as either
//!   `Storage` or `StorageCorruption`.
//! - A returned error means the store is unchanged by that call.

use crate::db::DbError;
use crate::model::candidate::CandidateId;
use crate::model::domain::Domain;
use crate::model::event::EventId;
use crate::model::validation::ValidationError;
use crate::tenant::principal::TenantId;
use rusqlite::ErrorCode;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Coarse error categories exposed to the calling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotEligible,
    NotFound,
    Conflict,
    StorageCorruption,
    Storage,
}

#[derive(Debug)]
pub enum LedgerError {
    /// Malformed caller input.
    Validation(ValidationError),
    /// Another candidate in the domain already uses this name.
    DuplicateName {
        domain: Domain,
        display_name: String,
    },
    /// The fairness gate rejected the candidate.
    NotEligible {
        domain: Domain,
        candidate_id: CandidateId,
        eligible: Vec<CandidateId>,
    },
    TenantNotFound(TenantId),
    EventNotFound(EventId),
    CandidateNotFound {
        domain: Domain,
        candidate_id: CandidateId,
    },
    /// Deletion refused because ledger rows still reference the candidate.
    CandidateHasHistory {
        domain: Domain,
        candidate_id: CandidateId,
        records: u32,
    },
    /// A write collided with a constraint set by a concurrent writer.
    Conflict(String),
    /// The store is unreadable, corrupt, or from a newer schema.
    StorageCorruption(DbError),
    /// A persisted row could not be decoded.
    InvalidData(String),
    /// I/O, lock timeout, or other SQLite failure.
    Storage(DbError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::DuplicateName { .. } => ErrorKind::Validation,
            Self::NotEligible { .. } => ErrorKind::NotEligible,
            Self::TenantNotFound(_) | Self::EventNotFound(_) | Self::CandidateNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::CandidateHasHistory { .. } | Self::Conflict(_) => ErrorKind::Conflict,
            Self::StorageCorruption(_) | Self::InvalidData(_) => ErrorKind::StorageCorruption,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Transient contention worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_busy())
    }
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateName {
                domain,
                display_name,
            } => write!(f, "{domain} candidate name already in use: `{display_name}`"),
            Self::NotEligible {
                domain,
                candidate_id,
                eligible,
            } => write!(
                f,
                "{domain} candidate {candidate_id} is not eligible; {} candidate(s) are due first",
                eligible.len()
            ),
            Self::TenantNotFound(tenant_id) => write!(f, "tenant not found: {tenant_id}"),
            Self::EventNotFound(event_id) => write!(f, "event not found: {event_id}"),
            Self::CandidateNotFound {
                domain,
                candidate_id,
            } => write!(f, "{domain} candidate not found: {candidate_id}"),
            Self::CandidateHasHistory {
                domain,
                candidate_id,
                records,
            } => write!(
                f,
                "{domain} candidate {candidate_id} has {records} assignment record(s); exclude it instead"
            ),
            Self::Conflict(detail) => write!(f, "concurrent write conflict: {detail}"),
            Self::StorageCorruption(err) => write!(f, "tenant store is unusable: {err}"),
            Self::InvalidData(detail) => write!(f, "invalid persisted ledger data: {detail}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StorageCorruption(err) | Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for LedgerError {
    fn from(value: DbError) -> Self {
        if value.is_corruption() {
            return Self::StorageCorruption(value);
        }
        if let DbError::Sqlite(err) = &value {
            if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
                return Self::Conflict(err.to_string());
            }
        }
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(value: rusqlite::Error) -> Self {
        DbError::Sqlite(value).into()
    }
}

//! Repository layer over one tenant store.
//!
//! # Responsibility
//! - Keep SQL for candidates, events, and the rotation ledger inside the
//!   persistence boundary.
//! - Decode rows strictly: malformed persisted state is reported, not masked.
//!
//! # Invariants
//! - Repositories borrow a connection (or a transaction deref'd to one);
//!   they never open, commit, or roll back on their own.
//! - Only `rotation_ledger` writes `award_count` and `currently_holds`.

pub mod candidate_repo;
pub mod event_repo;
pub mod rotation_ledger;

use crate::error::{LedgerError, LedgerResult};
use uuid::Uuid;

pub(crate) fn parse_uuid(value: &str, column: &str) -> LedgerResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| LedgerError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_flag(value: i64, column: &str) -> LedgerResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(LedgerError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_count(value: i64, column: &str) -> LedgerResult<u32> {
    u32::try_from(value).map_err(|_| {
        LedgerError::InvalidData(format!("invalid count value `{value}` in {column}"))
    })
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

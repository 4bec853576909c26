//! Domain model for candidates, events, and the assignment ledger.
//!
//! # Responsibility
//! - Define canonical data structures used by the rotation core.
//! - Own input normalization rules for names and free text.
//!
//! # Invariants
//! - Every entity belongs to exactly one tenant store and never references
//!   another tenant's rows.
//! - Identifiers are stable UUIDs; names are mutable labels.

pub mod assignment;
pub mod candidate;
pub mod domain;
pub mod event;
pub mod validation;

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

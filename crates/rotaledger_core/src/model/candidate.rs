//! Candidate domain model.
//!
//! # Responsibility
//! - Define the awardable entity shared by both domains.
//!
//! # Invariants
//! - `id` is stable across renames; history references the id, not the name.
//! - `award_count` and `currently_holds` are derived from ledger rows and are
//!   only written by the rotation ledger.
//! - `is_excluded` is manual and never changes `award_count`.

use crate::model::domain::Domain;
use crate::model::validation::{normalize_name, ValidationError, CANDIDATE_NAME_MAX_CHARS};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable candidate identifier.
pub type CandidateId = Uuid;

/// Awardable roster entry (a member in `Mvp`, a group in `Winner`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub domain: Domain,
    /// Unique within tenant + domain.
    pub display_name: String,
    /// Number of assignment records referencing this candidate.
    pub award_count: u32,
    /// True for the candidate named by the most recent ledger write.
    pub currently_holds: bool,
    /// Excluded candidates keep history but leave the active rotation.
    pub is_excluded: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Candidate {
    /// Creates a fresh candidate with zero awards.
    ///
    /// # Errors
    /// - Returns `ValidationError` when the display name is blank, too long,
    ///   or contains control characters.
    pub fn new(
        domain: Domain,
        display_name: &str,
        now_ms: i64,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            domain,
            display_name: normalize_display_name(display_name)?,
            award_count: 0,
            currently_holds: false,
            is_excluded: false,
            created_at: now_ms,
            updated_at: now_ms,
        })
    }
}

/// Normalizes a candidate display name.
pub fn normalize_display_name(value: &str) -> Result<String, ValidationError> {
    normalize_name("display_name", value, CANDIDATE_NAME_MAX_CHARS)
}

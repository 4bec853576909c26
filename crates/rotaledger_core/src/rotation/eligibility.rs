//! Fairness gate for award rotation.
//!
//! # Responsibility
//! - Decide which candidates the normal (non-override) path may choose.
//! - Summarize where a domain stands in its current rotation round.
//!
//! # Invariants
//! - Pure: no I/O, output depends only on the roster snapshot passed in.
//! - Only active (non-excluded) candidates take part.
//! - `eligible` is exactly the active candidates at the minimum count, in
//!   the order they appear in the input. No promise is made among ties.
//! - Repeatedly choosing from `eligible` means no active candidate reaches
//!   `n + 1` awards while another active candidate sits at `n`.

use crate::model::candidate::{Candidate, CandidateId};
use crate::model::domain::Domain;
use serde::Serialize;

/// Roster snapshot entry consumed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    pub candidate_id: CandidateId,
    pub award_count: u32,
    pub is_excluded: bool,
}

impl From<&Candidate> for Standing {
    fn from(candidate: &Candidate) -> Self {
        Self {
            candidate_id: candidate.id,
            award_count: candidate.award_count,
            is_excluded: candidate.is_excluded,
        }
    }
}

/// Engine output for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub domain: Domain,
    /// Minimum award count among active candidates; `None` when the active
    /// roster is empty.
    pub current_min: Option<u32>,
    pub eligible: Vec<CandidateId>,
}

impl Eligibility {
    /// Whether any assignment is possible at all.
    pub fn can_assign(&self) -> bool {
        self.current_min.is_some()
    }

    /// Whether the normal path may choose `candidate_id`.
    pub fn permits(&self, candidate_id: CandidateId) -> bool {
        self.eligible.contains(&candidate_id)
    }
}

/// Computes the eligible set over a roster snapshot.
pub fn evaluate(domain: Domain, roster: &[Standing]) -> Eligibility {
    let current_min = roster
        .iter()
        .filter(|standing| !standing.is_excluded)
        .map(|standing| standing.award_count)
        .min();

    let eligible = match current_min {
        Some(min) => roster
            .iter()
            .filter(|standing| !standing.is_excluded && standing.award_count == min)
            .map(|standing| standing.candidate_id)
            .collect(),
        None => Vec::new(),
    };

    Eligibility {
        domain,
        current_min,
        eligible,
    }
}

/// Rotation progress summary for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationStatus {
    pub domain: Domain,
    pub total_candidates: usize,
    pub active_candidates: usize,
    pub excluded_candidates: usize,
    /// Active candidates with at least one award.
    pub active_with_awards: usize,
    pub current_min: Option<u32>,
    /// 1-based round: every active candidate has `round - 1` awards or more.
    pub round: Option<u32>,
    /// Active candidates still due in the current round.
    pub eligible: Vec<CandidateId>,
    pub current_holder: Option<CandidateId>,
}

/// Builds a [`RotationStatus`] from a roster snapshot.
pub fn rotation_status(
    domain: Domain,
    roster: &[Standing],
    current_holder: Option<CandidateId>,
) -> RotationStatus {
    let eligibility = evaluate(domain, roster);
    let active: Vec<&Standing> = roster.iter().filter(|s| !s.is_excluded).collect();

    RotationStatus {
        domain,
        total_candidates: roster.len(),
        active_candidates: active.len(),
        excluded_candidates: roster.len() - active.len(),
        active_with_awards: active.iter().filter(|s| s.award_count > 0).count(),
        current_min: eligibility.current_min,
        round: eligibility.current_min.map(|min| min.saturating_add(1)),
        eligible: eligibility.eligible,
        current_holder,
    }
}

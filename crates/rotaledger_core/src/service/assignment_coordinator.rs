//! Award assignment use-cases.
//!
//! # Responsibility
//! - Validate, gate, and write award assignments.
//! - Expose eligibility, rotation status, holder, and history reads.
//! - Offer administrative reset and aggregate repair.
//!
//! # Invariants
//! - Every assignment is one IMMEDIATE transaction: the eligibility read,
//!   the ledger write, and the filled flag commit together or not at all.
//! - Re-assigning an event to the candidate it already names is a no-op.
//! - For a reassignment, the displaced record is discounted before the
//!   fairness gate runs, as if the event were unassigned.
//! - Forced assignments skip the fairness gate only; existence checks and
//!   aggregate maintenance still apply.

use crate::error::{LedgerError, LedgerResult};
use crate::model::assignment::AssignmentRecord;
use crate::model::candidate::{Candidate, CandidateId};
use crate::model::domain::Domain;
use crate::model::event::EventId;
use crate::model::now_epoch_ms;
use crate::repo::candidate_repo::{
    require_candidate, CandidateRepository, SqliteCandidateRepository,
};
use crate::repo::event_repo::{require_event, EventRepository, SqliteEventRepository};
use crate::repo::rotation_ledger::RotationLedger;
use crate::rotation::eligibility::{
    evaluate, rotation_status, Eligibility, RotationStatus, Standing,
};
use crate::tenant::store::StoreHandle;
use log::{info, warn};
use serde::Serialize;
use std::time::Instant;

/// Per-call assignment switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignOptions {
    /// Bypass the fairness gate (administrative override). The record is
    /// flagged `forced`.
    pub force: bool,
}

impl AssignOptions {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

/// A candidate whose stored `award_count` disagrees with the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateDrift {
    pub candidate_id: CandidateId,
    pub stored: u32,
    pub ledger: u32,
}

/// Sole mutator of ledger state for one tenant store.
pub struct AssignmentCoordinator<'h> {
    handle: &'h StoreHandle,
}

impl<'h> AssignmentCoordinator<'h> {
    pub fn new(handle: &'h StoreHandle) -> Self {
        Self { handle }
    }

    /// Assigns `candidate_id` as the `domain` award holder for `event_id`.
    ///
    /// # Errors
    /// - `EventNotFound` / `CandidateNotFound` for ids absent from this tenant.
    /// - `NotEligible` when the fairness gate rejects the candidate and
    ///   `options.force` is unset.
    /// - `Storage` / `StorageCorruption` on persistence failures; nothing is
    ///   written in that case.
    pub fn assign(
        &self,
        domain: Domain,
        event_id: EventId,
        candidate_id: CandidateId,
        options: AssignOptions,
    ) -> LedgerResult<AssignmentRecord> {
        let started_at = Instant::now();
        let result = self.handle.write(|tx| {
            let event = require_event(tx, event_id)?;
            require_candidate(tx, domain, candidate_id)?;

            let ledger = RotationLedger::new(tx, domain);
            let prior = ledger.record_for_event(event_id)?;
            if let Some(existing) = prior.as_ref() {
                if existing.candidate_id == candidate_id {
                    return Ok((existing.clone(), false));
                }
            }

            if !options.force {
                let roster = SqliteCandidateRepository::new(tx, domain).list_candidates()?;
                let displaced = prior.as_ref().map(|record| record.candidate_id);
                let eligibility = evaluate(domain, &standings_without(&roster, displaced));
                if !eligibility.permits(candidate_id) {
                    return Err(LedgerError::NotEligible {
                        domain,
                        candidate_id,
                        eligible: eligibility.eligible,
                    });
                }
            }

            let now_ms = now_epoch_ms();
            let record = ledger.record(candidate_id, event_id, options.force, now_ms)?;
            if !event.is_filled(domain) {
                SqliteEventRepository::new(tx).set_filled(event_id, domain, true, now_ms)?;
            }
            Ok((record, true))
        });

        let elapsed_ms = started_at.elapsed().as_millis();
        match result {
            Ok((record, written)) => {
                info!(
                    "event=assign module=coordinator status={} tenant={} domain={} event_id={} candidate={} forced={} duration_ms={}",
                    if written { "ok" } else { "unchanged" },
                    self.handle.tenant_id(),
                    domain,
                    event_id,
                    candidate_id,
                    record.forced,
                    elapsed_ms
                );
                Ok(record)
            }
            Err(err) => {
                warn!(
                    "event=assign module=coordinator status=error tenant={} domain={} event_id={} candidate={} kind={:?} duration_ms={}",
                    self.handle.tenant_id(),
                    domain,
                    event_id,
                    candidate_id,
                    err.kind(),
                    elapsed_ms
                );
                Err(err)
            }
        }
    }

    /// Candidates the normal path may choose right now.
    pub fn eligibility(&self, domain: Domain) -> LedgerResult<Eligibility> {
        self.handle.read(|conn| {
            let roster = SqliteCandidateRepository::new(conn, domain).list_candidates()?;
            Ok(evaluate(domain, &standings_without(&roster, None)))
        })
    }

    pub fn rotation_status(&self, domain: Domain) -> LedgerResult<RotationStatus> {
        self.handle.read(|conn| {
            let roster = SqliteCandidateRepository::new(conn, domain).list_candidates()?;
            let holder = RotationLedger::new(conn, domain).current_holder()?;
            Ok(rotation_status(
                domain,
                &standings_without(&roster, None),
                holder,
            ))
        })
    }

    pub fn current_holder(&self, domain: Domain) -> LedgerResult<Option<Candidate>> {
        self.handle.read(|conn| {
            match RotationLedger::new(conn, domain).current_holder()? {
                Some(id) => require_candidate(conn, domain, id).map(Some),
                None => Ok(None),
            }
        })
    }

    /// Every record naming `candidate_id`, oldest first.
    pub fn history_of(
        &self,
        domain: Domain,
        candidate_id: CandidateId,
    ) -> LedgerResult<Vec<AssignmentRecord>> {
        self.history_page(domain, candidate_id, 0, None)
    }

    /// One page of [`Self::history_of`].
    pub fn history_page(
        &self,
        domain: Domain,
        candidate_id: CandidateId,
        offset: u32,
        limit: Option<u32>,
    ) -> LedgerResult<Vec<AssignmentRecord>> {
        self.handle.read(|conn| {
            require_candidate(conn, domain, candidate_id)?;
            RotationLedger::new(conn, domain).history_page(candidate_id, offset, limit)
        })
    }

    /// Starts a fresh rotation: deletes every record, zeroes counts, clears
    /// the holder and every event's filled flag for `domain`.
    ///
    /// Returns the number of deleted records.
    pub fn reset_rotation(&self, domain: Domain) -> LedgerResult<usize> {
        let removed = self.handle.write(|tx| {
            let removed = RotationLedger::new(tx, domain).clear()?;
            SqliteEventRepository::new(tx).clear_filled(domain, now_epoch_ms())?;
            Ok(removed)
        })?;
        warn!(
            "event=rotation_reset module=coordinator status=ok tenant={} domain={} removed_records={}",
            self.handle.tenant_id(),
            domain,
            removed
        );
        Ok(removed)
    }

    /// Candidates whose stored count disagrees with their ledger rows.
    pub fn verify_aggregates(&self, domain: Domain) -> LedgerResult<Vec<AggregateDrift>> {
        self.handle.read(|conn| {
            let roster = SqliteCandidateRepository::new(conn, domain).list_candidates()?;
            let tallies = RotationLedger::new(conn, domain).tallies()?;
            Ok(roster
                .iter()
                .filter_map(|candidate| {
                    let ledger = tallies
                        .iter()
                        .find(|(id, _)| *id == candidate.id)
                        .map_or(0, |(_, count)| *count);
                    (ledger != candidate.award_count).then_some(AggregateDrift {
                        candidate_id: candidate.id,
                        stored: candidate.award_count,
                        ledger,
                    })
                })
                .collect())
        })
    }

    /// Rewrites counts from ledger rows and recomputes the holder.
    ///
    /// Returns the number of repaired candidates.
    pub fn rebuild_aggregates(&self, domain: Domain) -> LedgerResult<usize> {
        let repaired = self
            .handle
            .write(|tx| RotationLedger::new(tx, domain).recount_awards())?;
        if repaired > 0 {
            warn!(
                "event=aggregate_rebuild module=coordinator status=repaired tenant={} domain={} candidates={}",
                self.handle.tenant_id(),
                domain,
                repaired
            );
        }
        Ok(repaired)
    }
}

/// Roster standings, with one award taken off `displaced` (the candidate
/// whose record a reassignment would replace).
fn standings_without(roster: &[Candidate], displaced: Option<CandidateId>) -> Vec<Standing> {
    roster
        .iter()
        .map(|candidate| {
            let mut standing = Standing::from(candidate);
            if Some(candidate.id) == displaced {
                standing.award_count = standing.award_count.saturating_sub(1);
            }
            standing
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::standings_without;
    use crate::model::candidate::Candidate;
    use crate::model::domain::Domain;

    #[test]
    fn displaced_candidate_is_discounted_once() {
        let mut a = Candidate::new(Domain::Mvp, "Aria", 1).expect("valid");
        a.award_count = 1;
        let mut b = Candidate::new(Domain::Mvp, "Brock", 2).expect("valid");
        b.award_count = 1;

        let standings = standings_without(&[a.clone(), b.clone()], Some(a.id));
        assert_eq!(standings[0].award_count, 0);
        assert_eq!(standings[1].award_count, 1);

        let untouched = standings_without(&[a, b], None);
        assert!(untouched.iter().all(|standing| standing.award_count == 1));
    }
}

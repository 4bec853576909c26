//! Roster use-case service.
//!
//! # Responsibility
//! - Create, rename, exclude/include, and delete candidates in one domain.
//! - Keep name uniqueness and history-preservation rules at one place.
//!
//! # Invariants
//! - Exclusion never touches `award_count` or history.
//! - Excluding the current holder clears the holder flag; including a
//!   candidate never sets it.
//! - A candidate with ledger history cannot be deleted.

use crate::error::{LedgerError, LedgerResult};
use crate::model::candidate::{normalize_display_name, Candidate, CandidateId};
use crate::model::domain::Domain;
use crate::model::now_epoch_ms;
use crate::repo::candidate_repo::{
    name_taken, require_candidate, CandidateRepository, SqliteCandidateRepository,
};
use crate::repo::rotation_ledger::RotationLedger;
use crate::tenant::store::StoreHandle;
use log::info;

/// Roster operations over one tenant store.
pub struct RosterService<'h> {
    handle: &'h StoreHandle,
}

impl<'h> RosterService<'h> {
    pub fn new(handle: &'h StoreHandle) -> Self {
        Self { handle }
    }

    /// Full roster in insertion order, excluded candidates included.
    pub fn list_candidates(&self, domain: Domain) -> LedgerResult<Vec<Candidate>> {
        self.handle
            .read(|conn| SqliteCandidateRepository::new(conn, domain).list_candidates())
    }

    pub fn get_candidate(&self, domain: Domain, id: CandidateId) -> LedgerResult<Candidate> {
        self.handle.read(|conn| require_candidate(conn, domain, id))
    }

    /// Adds a candidate with zero awards.
    ///
    /// # Errors
    /// - `Validation` for a malformed name.
    /// - `DuplicateName` when the name is used in the domain.
    pub fn create_candidate(&self, domain: Domain, display_name: &str) -> LedgerResult<Candidate> {
        let candidate = Candidate::new(domain, display_name, now_epoch_ms())?;
        self.handle.write(|tx| {
            if name_taken(tx, domain, &candidate.display_name, None)? {
                return Err(duplicate(domain, &candidate.display_name));
            }
            SqliteCandidateRepository::new(tx, domain).insert_candidate(&candidate)
        })?;

        info!(
            "event=candidate_create module=roster status=ok tenant={} domain={} candidate={}",
            self.handle.tenant_id(),
            domain,
            candidate.id
        );
        Ok(candidate)
    }

    /// Renames in place; history keeps pointing at the same id.
    pub fn rename_candidate(
        &self,
        domain: Domain,
        id: CandidateId,
        display_name: &str,
    ) -> LedgerResult<Candidate> {
        let display_name = normalize_display_name(display_name)?;
        self.handle.write(|tx| {
            require_candidate(tx, domain, id)?;
            if name_taken(tx, domain, &display_name, Some(id))? {
                return Err(duplicate(domain, &display_name));
            }
            SqliteCandidateRepository::new(tx, domain).rename_candidate(
                id,
                &display_name,
                now_epoch_ms(),
            )?;
            require_candidate(tx, domain, id)
        })
    }

    /// Moves a candidate out of (or back into) the active rotation.
    ///
    /// Excluding the current holder clears the holder flag. Including keeps
    /// the preserved count and does not restore the flag.
    pub fn set_excluded(
        &self,
        domain: Domain,
        id: CandidateId,
        excluded: bool,
    ) -> LedgerResult<Candidate> {
        let candidate = self.handle.write(|tx| {
            let before = require_candidate(tx, domain, id)?;
            if before.is_excluded == excluded {
                return Ok(before);
            }
            SqliteCandidateRepository::new(tx, domain).set_excluded(id, excluded, now_epoch_ms())?;
            if excluded && before.currently_holds {
                RotationLedger::new(tx, domain).release_holder(id)?;
            }
            require_candidate(tx, domain, id)
        })?;

        info!(
            "event=candidate_exclude module=roster status=ok tenant={} domain={} candidate={} excluded={}",
            self.handle.tenant_id(),
            domain,
            id,
            excluded
        );
        Ok(candidate)
    }

    /// Deletes a candidate that never received an award.
    ///
    /// # Errors
    /// - `CandidateHasHistory` when ledger rows reference the candidate;
    ///   exclude it instead.
    pub fn delete_candidate(&self, domain: Domain, id: CandidateId) -> LedgerResult<()> {
        self.handle.write(|tx| {
            require_candidate(tx, domain, id)?;
            let records = RotationLedger::new(tx, domain).count_for(id)?;
            if records > 0 {
                return Err(LedgerError::CandidateHasHistory {
                    domain,
                    candidate_id: id,
                    records,
                });
            }
            SqliteCandidateRepository::new(tx, domain).delete_candidate(id)
        })?;

        info!(
            "event=candidate_delete module=roster status=ok tenant={} domain={} candidate={}",
            self.handle.tenant_id(),
            domain,
            id
        );
        Ok(())
    }
}

fn duplicate(domain: Domain, display_name: &str) -> LedgerError {
    LedgerError::DuplicateName {
        domain,
        display_name: display_name.to_string(),
    }
}

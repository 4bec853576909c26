//! Candidate repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide roster CRUD over the per-domain candidate table.
//!
//! # Invariants
//! - Roster order is insertion order: `created_at ASC, rowid ASC`.
//! - This repository never writes `award_count` or `currently_holds`.

use crate::error::{LedgerError, LedgerResult};
use crate::model::candidate::{Candidate, CandidateId};
use crate::model::domain::Domain;
use crate::repo::{bool_to_int, parse_count, parse_flag, parse_uuid};
use rusqlite::{params, Connection, Row};

const CANDIDATE_COLUMNS: &str = "uuid,
    display_name,
    award_count,
    currently_holds,
    is_excluded,
    created_at,
    updated_at";

/// Repository interface for one domain's roster.
pub trait CandidateRepository {
    fn insert_candidate(&self, candidate: &Candidate) -> LedgerResult<()>;
    fn get_candidate(&self, id: CandidateId) -> LedgerResult<Option<Candidate>>;
    fn find_by_name(&self, display_name: &str) -> LedgerResult<Option<Candidate>>;
    /// Full roster, excluded candidates included, in insertion order.
    fn list_candidates(&self) -> LedgerResult<Vec<Candidate>>;
    fn rename_candidate(&self, id: CandidateId, display_name: &str, now_ms: i64)
        -> LedgerResult<()>;
    fn set_excluded(&self, id: CandidateId, excluded: bool, now_ms: i64) -> LedgerResult<()>;
    fn delete_candidate(&self, id: CandidateId) -> LedgerResult<()>;
}

/// SQLite-backed roster repository for one domain.
pub struct SqliteCandidateRepository<'conn> {
    conn: &'conn Connection,
    domain: Domain,
}

impl<'conn> SqliteCandidateRepository<'conn> {
    pub fn new(conn: &'conn Connection, domain: Domain) -> Self {
        Self { conn, domain }
    }

    fn not_found(&self, candidate_id: CandidateId) -> LedgerError {
        LedgerError::CandidateNotFound {
            domain: self.domain,
            candidate_id,
        }
    }

    fn parse_row(&self, row: &Row<'_>) -> LedgerResult<Candidate> {
        let table = self.domain.candidate_table();
        let uuid_text: String = row.get("uuid")?;
        Ok(Candidate {
            id: parse_uuid(&uuid_text, table)?,
            domain: self.domain,
            display_name: row.get("display_name")?,
            award_count: parse_count(row.get("award_count")?, table)?,
            currently_holds: parse_flag(row.get("currently_holds")?, table)?,
            is_excluded: parse_flag(row.get("is_excluded")?, table)?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn query_one(&self, filter: &str, value: &str) -> LedgerResult<Option<Candidate>> {
        let sql = format!(
            "SELECT {CANDIDATE_COLUMNS} FROM {} WHERE {filter} = ?1;",
            self.domain.candidate_table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([value])?;
        match rows.next()? {
            Some(row) => Ok(Some(self.parse_row(row)?)),
            None => Ok(None),
        }
    }
}

impl CandidateRepository for SqliteCandidateRepository<'_> {
    fn insert_candidate(&self, candidate: &Candidate) -> LedgerResult<()> {
        let sql = format!(
            "INSERT INTO {} ({CANDIDATE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            self.domain.candidate_table()
        );
        self.conn.execute(
            &sql,
            params![
                candidate.id.to_string(),
                candidate.display_name.as_str(),
                i64::from(candidate.award_count),
                bool_to_int(candidate.currently_holds),
                bool_to_int(candidate.is_excluded),
                candidate.created_at,
                candidate.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_candidate(&self, id: CandidateId) -> LedgerResult<Option<Candidate>> {
        self.query_one("uuid", &id.to_string())
    }

    fn find_by_name(&self, display_name: &str) -> LedgerResult<Option<Candidate>> {
        self.query_one("display_name", display_name)
    }

    fn list_candidates(&self) -> LedgerResult<Vec<Candidate>> {
        let sql = format!(
            "SELECT {CANDIDATE_COLUMNS} FROM {} ORDER BY created_at ASC, rowid ASC;",
            self.domain.candidate_table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut roster = Vec::new();
        while let Some(row) = rows.next()? {
            roster.push(self.parse_row(row)?);
        }
        Ok(roster)
    }

    fn rename_candidate(
        &self,
        id: CandidateId,
        display_name: &str,
        now_ms: i64,
    ) -> LedgerResult<()> {
        let sql = format!(
            "UPDATE {} SET display_name = ?2, updated_at = ?3 WHERE uuid = ?1;",
            self.domain.candidate_table()
        );
        let changed = self
            .conn
            .execute(&sql, params![id.to_string(), display_name, now_ms])?;
        if changed == 0 {
            return Err(self.not_found(id));
        }
        Ok(())
    }

    fn set_excluded(&self, id: CandidateId, excluded: bool, now_ms: i64) -> LedgerResult<()> {
        let sql = format!(
            "UPDATE {} SET is_excluded = ?2, updated_at = ?3 WHERE uuid = ?1;",
            self.domain.candidate_table()
        );
        let changed = self
            .conn
            .execute(&sql, params![id.to_string(), bool_to_int(excluded), now_ms])?;
        if changed == 0 {
            return Err(self.not_found(id));
        }
        Ok(())
    }

    fn delete_candidate(&self, id: CandidateId) -> LedgerResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE uuid = ?1;",
            self.domain.candidate_table()
        );
        let changed = self.conn.execute(&sql, [id.to_string()])?;
        if changed == 0 {
            return Err(self.not_found(id));
        }
        Ok(())
    }
}

/// Loads one candidate or fails with `CandidateNotFound`.
pub(crate) fn require_candidate(
    conn: &Connection,
    domain: Domain,
    id: CandidateId,
) -> LedgerResult<Candidate> {
    SqliteCandidateRepository::new(conn, domain)
        .get_candidate(id)?
        .ok_or(LedgerError::CandidateNotFound {
            domain,
            candidate_id: id,
        })
}

/// Returns whether any candidate row in the domain uses `display_name`,
/// ignoring `except` (used by rename).
pub(crate) fn name_taken(
    conn: &Connection,
    domain: Domain,
    display_name: &str,
    except: Option<CandidateId>,
) -> LedgerResult<bool> {
    let existing = SqliteCandidateRepository::new(conn, domain).find_by_name(display_name)?;
    Ok(matches!(existing, Some(candidate) if Some(candidate.id) != except))
}


//! Rotation ledger over one domain's assignment table.
//!
//! # Responsibility
//! - Append/replace assignment records, one per `(event, domain)`.
//! - Keep the derived candidate aggregates (`award_count`,
//!   `currently_holds`) in step with the ledger rows.
//!
//! # Invariants
//! - Mutating methods run inside the caller's transaction; each leaves
//!   `award_count(c) == |records referencing c|` when it returns `Ok`.
//! - The holder is recomputed from the newest row (`seq DESC`), never
//!   tracked as separate state. An excluded newest candidate yields no
//!   holder.
//! - History is chronological: `assigned_at ASC, seq ASC`.

use crate::error::LedgerResult;
use crate::model::assignment::AssignmentRecord;
use crate::model::candidate::CandidateId;
use crate::model::domain::Domain;
use crate::model::event::EventId;
use crate::repo::{bool_to_int, parse_count, parse_flag, parse_uuid};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

/// Append/replace API over one domain's assignment rows.
pub struct RotationLedger<'conn> {
    conn: &'conn Connection,
    domain: Domain,
}

impl<'conn> RotationLedger<'conn> {
    pub fn new(conn: &'conn Connection, domain: Domain) -> Self {
        Self { conn, domain }
    }

    /// Writes `candidate_id` as the award holder for `event_id`.
    ///
    /// Replaces any prior record for the event: the displaced candidate is
    /// decremented, the new one incremented, and the holder recomputed.
    /// Callers must have validated that both rows exist.
    pub fn record(
        &self,
        candidate_id: CandidateId,
        event_id: EventId,
        forced: bool,
        now_ms: i64,
    ) -> LedgerResult<AssignmentRecord> {
        debug_assert!(
            !self.conn.is_autocommit(),
            "rotation ledger writes require an open transaction"
        );

        if let Some(prior) = self.delete_event_row(event_id)? {
            self.adjust_count(prior.candidate_id, -1)?;
            debug!(
                "event=ledger_displace module=ledger domain={} record={}",
                self.domain, prior.id
            );
        }

        let record = AssignmentRecord {
            id: Uuid::new_v4(),
            domain: self.domain,
            event_id,
            candidate_id,
            assigned_at: now_ms,
            forced,
        };
        let sql = format!(
            "INSERT INTO {} (uuid, event_uuid, candidate_uuid, forced, assigned_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            self.domain.assignment_table()
        );
        self.conn.execute(
            &sql,
            params![
                record.id.to_string(),
                event_id.to_string(),
                candidate_id.to_string(),
                bool_to_int(forced),
                now_ms,
            ],
        )?;
        self.adjust_count(candidate_id, 1)?;
        self.recompute_holder()?;
        Ok(record)
    }

    /// Deletes the record for `event_id`, if any, and repairs aggregates.
    pub fn remove_for_event(&self, event_id: EventId) -> LedgerResult<Option<AssignmentRecord>> {
        debug_assert!(!self.conn.is_autocommit());

        let removed = self.delete_event_row(event_id)?;
        if let Some(record) = &removed {
            self.adjust_count(record.candidate_id, -1)?;
            self.recompute_holder()?;
        }
        Ok(removed)
    }

    /// The record currently filling `event_id`'s slot.
    pub fn record_for_event(&self, event_id: EventId) -> LedgerResult<Option<AssignmentRecord>> {
        let sql = format!("{} WHERE event_uuid = ?1;", self.select_sql());
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([event_id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(self.parse_row(row)?)),
            None => Ok(None),
        }
    }

    /// All records naming `candidate_id`, oldest first.
    pub fn history_of(&self, candidate_id: CandidateId) -> LedgerResult<Vec<AssignmentRecord>> {
        self.history_page(candidate_id, 0, None)
    }

    /// One page of [`Self::history_of`]. Re-querying with the same offset
    /// restarts the page.
    pub fn history_page(
        &self,
        candidate_id: CandidateId,
        offset: u32,
        limit: Option<u32>,
    ) -> LedgerResult<Vec<AssignmentRecord>> {
        let sql = format!(
            "{} WHERE candidate_uuid = ?1 ORDER BY assigned_at ASC, seq ASC LIMIT ?2 OFFSET ?3;",
            self.select_sql()
        );
        let limit = limit.map_or(-1, i64::from);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![candidate_id.to_string(), limit, i64::from(offset)])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(self.parse_row(row)?);
        }
        Ok(records)
    }

    /// The candidate flagged as current holder, if any.
    pub fn current_holder(&self) -> LedgerResult<Option<CandidateId>> {
        let sql = format!(
            "SELECT uuid FROM {} WHERE currently_holds = 1 LIMIT 1;",
            self.domain.candidate_table()
        );
        let holder: Option<String> = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .optional()?;
        holder
            .map(|value| parse_uuid(&value, self.domain.candidate_table()))
            .transpose()
    }

    /// The most recently written record in the domain.
    pub fn latest_record(&self) -> LedgerResult<Option<AssignmentRecord>> {
        let sql = format!("{} ORDER BY seq DESC LIMIT 1;", self.select_sql());
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(Some(self.parse_row(row)?)),
            None => Ok(None),
        }
    }

    /// Number of records naming `candidate_id`.
    pub fn count_for(&self, candidate_id: CandidateId) -> LedgerResult<u32> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE candidate_uuid = ?1;",
            self.domain.assignment_table()
        );
        let count: i64 = self
            .conn
            .query_row(&sql, [candidate_id.to_string()], |row| row.get(0))?;
        parse_count(count, self.domain.assignment_table())
    }

    /// Ledger-derived award counts for every candidate in the roster.
    pub fn tallies(&self) -> LedgerResult<Vec<(CandidateId, u32)>> {
        let sql = format!(
            "SELECT c.uuid, COUNT(a.seq)
             FROM {} c
             LEFT JOIN {} a ON a.candidate_uuid = c.uuid
             GROUP BY c.uuid
             ORDER BY c.created_at ASC, c.rowid ASC;",
            self.domain.candidate_table(),
            self.domain.assignment_table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut tallies = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            tallies.push((
                parse_uuid(&uuid_text, self.domain.candidate_table())?,
                parse_count(count, self.domain.assignment_table())?,
            ));
        }
        Ok(tallies)
    }

    /// Clears the holder flag and sets it on the newest record's candidate
    /// unless that candidate is excluded.
    pub fn recompute_holder(&self) -> LedgerResult<Option<CandidateId>> {
        let table = self.domain.candidate_table();
        self.conn.execute(
            &format!("UPDATE {table} SET currently_holds = 0 WHERE currently_holds = 1;"),
            [],
        )?;

        let Some(latest) = self.latest_record()? else {
            return Ok(None);
        };
        let changed = self.conn.execute(
            &format!(
                "UPDATE {table} SET currently_holds = 1 WHERE uuid = ?1 AND is_excluded = 0;"
            ),
            [latest.candidate_id.to_string()],
        )?;
        Ok((changed == 1).then_some(latest.candidate_id))
    }

    /// Clears the holder flag when `candidate_id` carries it.
    ///
    /// The flag stays cleared until the next ledger write recomputes it.
    pub fn release_holder(&self, candidate_id: CandidateId) -> LedgerResult<bool> {
        let sql = format!(
            "UPDATE {} SET currently_holds = 0 WHERE uuid = ?1 AND currently_holds = 1;",
            self.domain.candidate_table()
        );
        Ok(self.conn.execute(&sql, [candidate_id.to_string()])? == 1)
    }

    /// Rewrites every `award_count` from the ledger rows.
    pub fn recount_awards(&self) -> LedgerResult<usize> {
        debug_assert!(!self.conn.is_autocommit());

        let sql = format!(
            "UPDATE {cand}
             SET award_count = (
                SELECT COUNT(*) FROM {assign} a WHERE a.candidate_uuid = {cand}.uuid
             )
             WHERE award_count <> (
                SELECT COUNT(*) FROM {assign} a WHERE a.candidate_uuid = {cand}.uuid
             );",
            cand = self.domain.candidate_table(),
            assign = self.domain.assignment_table()
        );
        let repaired = self.conn.execute(&sql, [])?;
        self.recompute_holder()?;
        Ok(repaired)
    }

    /// Deletes every record and zeroes every aggregate in the domain.
    pub fn clear(&self) -> LedgerResult<usize> {
        debug_assert!(!self.conn.is_autocommit());

        let removed = self.conn.execute(
            &format!("DELETE FROM {};", self.domain.assignment_table()),
            [],
        )?;
        self.conn.execute(
            &format!(
                "UPDATE {} SET award_count = 0, currently_holds = 0;",
                self.domain.candidate_table()
            ),
            [],
        )?;
        Ok(removed)
    }

    fn delete_event_row(&self, event_id: EventId) -> LedgerResult<Option<AssignmentRecord>> {
        let Some(prior) = self.record_for_event(event_id)? else {
            return Ok(None);
        };
        self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE uuid = ?1;",
                self.domain.assignment_table()
            ),
            [prior.id.to_string()],
        )?;
        Ok(Some(prior))
    }

    fn adjust_count(&self, candidate_id: CandidateId, delta: i64) -> LedgerResult<()> {
        let sql = format!(
            "UPDATE {} SET award_count = award_count + ?2 WHERE uuid = ?1;",
            self.domain.candidate_table()
        );
        self.conn
            .execute(&sql, params![candidate_id.to_string(), delta])?;
        Ok(())
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT uuid, event_uuid, candidate_uuid, forced, assigned_at FROM {}",
            self.domain.assignment_table()
        )
    }

    fn parse_row(&self, row: &Row<'_>) -> LedgerResult<AssignmentRecord> {
        let table = self.domain.assignment_table();
        let uuid_text: String = row.get("uuid")?;
        let event_text: String = row.get("event_uuid")?;
        let candidate_text: String = row.get("candidate_uuid")?;
        Ok(AssignmentRecord {
            id: parse_uuid(&uuid_text, table)?,
            domain: self.domain,
            event_id: parse_uuid(&event_text, table)?,
            candidate_id: parse_uuid(&candidate_text, table)?,
            assigned_at: row.get("assigned_at")?,
            forced: parse_flag(row.get("forced")?, table)?,
        })
    }
}

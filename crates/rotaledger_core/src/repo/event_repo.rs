//! Event repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Listing is newest first: `event_date DESC, rowid DESC`.
//! - Filled flags are written only through `set_filled` / `clear_filled`,
//!   which the assignment path calls inside its transaction.

use crate::error::{LedgerError, LedgerResult};
use crate::model::domain::Domain;
use crate::model::event::{Event, EventDraft, EventId};
use crate::repo::{bool_to_int, parse_flag, parse_uuid};
use rusqlite::{params, Connection, Row};

const EVENT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    event_date,
    mvp_filled,
    winner_filled,
    created_at,
    updated_at
FROM events";

/// Repository interface for events.
pub trait EventRepository {
    fn insert_event(&self, event: &Event) -> LedgerResult<()>;
    fn get_event(&self, id: EventId) -> LedgerResult<Option<Event>>;
    fn list_events(&self) -> LedgerResult<Vec<Event>>;
    /// Events whose slot for `domain` is still unassigned.
    fn list_open_events(&self, domain: Domain) -> LedgerResult<Vec<Event>>;
    fn update_event_details(&self, id: EventId, draft: &EventDraft, now_ms: i64)
        -> LedgerResult<()>;
    fn delete_event(&self, id: EventId) -> LedgerResult<()>;
    fn set_filled(&self, id: EventId, domain: Domain, filled: bool, now_ms: i64)
        -> LedgerResult<()>;
    /// Marks every event's slot for `domain` as unassigned.
    fn clear_filled(&self, domain: Domain, now_ms: i64) -> LedgerResult<usize>;
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_many(&self, sql: &str) -> LedgerResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn insert_event(&self, event: &Event) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO events (
                uuid,
                name,
                description,
                event_date,
                mvp_filled,
                winner_filled,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                event.id.to_string(),
                event.name.as_str(),
                event.description.as_deref(),
                event.event_date,
                bool_to_int(event.mvp_filled),
                bool_to_int(event.winner_filled),
                event.created_at,
                event.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_event(&self, id: EventId) -> LedgerResult<Option<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_event_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_events(&self) -> LedgerResult<Vec<Event>> {
        self.query_many(&format!(
            "{EVENT_SELECT_SQL} ORDER BY event_date DESC, rowid DESC;"
        ))
    }

    fn list_open_events(&self, domain: Domain) -> LedgerResult<Vec<Event>> {
        self.query_many(&format!(
            "{EVENT_SELECT_SQL} WHERE {} = 0 ORDER BY event_date DESC, rowid DESC;",
            domain.event_filled_column()
        ))
    }

    fn update_event_details(
        &self,
        id: EventId,
        draft: &EventDraft,
        now_ms: i64,
    ) -> LedgerResult<()> {
        let changed = self.conn.execute(
            "UPDATE events
             SET
                name = ?2,
                description = ?3,
                event_date = ?4,
                updated_at = ?5
             WHERE uuid = ?1;",
            params![
                id.to_string(),
                draft.name.as_str(),
                draft.description.as_deref(),
                draft.event_date,
                now_ms,
            ],
        )?;
        if changed == 0 {
            return Err(LedgerError::EventNotFound(id));
        }
        Ok(())
    }

    fn delete_event(&self, id: EventId) -> LedgerResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM events WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(LedgerError::EventNotFound(id));
        }
        Ok(())
    }

    fn set_filled(
        &self,
        id: EventId,
        domain: Domain,
        filled: bool,
        now_ms: i64,
    ) -> LedgerResult<()> {
        let sql = format!(
            "UPDATE events SET {} = ?2, updated_at = ?3 WHERE uuid = ?1;",
            domain.event_filled_column()
        );
        let changed = self
            .conn
            .execute(&sql, params![id.to_string(), bool_to_int(filled), now_ms])?;
        if changed == 0 {
            return Err(LedgerError::EventNotFound(id));
        }
        Ok(())
    }

    fn clear_filled(&self, domain: Domain, now_ms: i64) -> LedgerResult<usize> {
        let column = domain.event_filled_column();
        let sql = format!("UPDATE events SET {column} = 0, updated_at = ?1 WHERE {column} = 1;");
        Ok(self.conn.execute(&sql, [now_ms])?)
    }
}

/// Loads one event or fails with `EventNotFound`.
pub(crate) fn require_event(conn: &Connection, id: EventId) -> LedgerResult<Event> {
    SqliteEventRepository::new(conn)
        .get_event(id)?
        .ok_or(LedgerError::EventNotFound(id))
}

fn parse_event_row(row: &Row<'_>) -> LedgerResult<Event> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Event {
        id: parse_uuid(&uuid_text, "events.uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        event_date: row.get("event_date")?,
        mvp_filled: parse_flag(row.get("mvp_filled")?, "events.mvp_filled")?,
        winner_filled: parse_flag(row.get("winner_filled")?, "events.winner_filled")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

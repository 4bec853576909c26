//! Event use-case service.
//!
//! # Responsibility
//! - Create, edit, list, and delete events.
//! - Cascade event deletion through both rotation ledgers.
//!
//! # Invariants
//! - Editing never touches the filled flags or any assignment record.
//! - Deleting an event removes its records in both domains and repairs
//!   counts and holders in the same transaction.

use crate::error::LedgerResult;
use crate::model::domain::Domain;
use crate::model::event::{Event, EventDraft, EventId};
use crate::model::now_epoch_ms;
use crate::repo::event_repo::{require_event, EventRepository, SqliteEventRepository};
use crate::repo::rotation_ledger::RotationLedger;
use crate::tenant::store::StoreHandle;
use log::info;
use uuid::Uuid;

/// Event operations over one tenant store.
pub struct EventService<'h> {
    handle: &'h StoreHandle,
}

impl<'h> EventService<'h> {
    pub fn new(handle: &'h StoreHandle) -> Self {
        Self { handle }
    }

    pub fn create_event(&self, draft: &EventDraft) -> LedgerResult<Event> {
        let draft = draft.normalized()?;
        let now_ms = now_epoch_ms();
        let event = Event {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            event_date: draft.event_date,
            mvp_filled: false,
            winner_filled: false,
            created_at: now_ms,
            updated_at: now_ms,
        };
        self.handle
            .write(|tx| SqliteEventRepository::new(tx).insert_event(&event))?;

        info!(
            "event=event_create module=events status=ok tenant={} event={}",
            self.handle.tenant_id(),
            event.id
        );
        Ok(event)
    }

    /// Replaces name, description, and date.
    pub fn edit_event(&self, id: EventId, draft: &EventDraft) -> LedgerResult<Event> {
        let draft = draft.normalized()?;
        self.handle.write(|tx| {
            SqliteEventRepository::new(tx).update_event_details(id, &draft, now_epoch_ms())?;
            require_event(tx, id)
        })
    }

    pub fn get_event(&self, id: EventId) -> LedgerResult<Event> {
        self.handle.read(|conn| require_event(conn, id))
    }

    /// All events, newest `event_date` first.
    pub fn list_events(&self) -> LedgerResult<Vec<Event>> {
        self.handle
            .read(|conn| SqliteEventRepository::new(conn).list_events())
    }

    /// Events whose `domain` slot is still unassigned, newest first.
    pub fn list_open_events(&self, domain: Domain) -> LedgerResult<Vec<Event>> {
        self.handle
            .read(|conn| SqliteEventRepository::new(conn).list_open_events(domain))
    }

    /// Deletes an event and every assignment record attached to it.
    ///
    /// Returns the number of removed records across both domains.
    pub fn delete_event(&self, id: EventId) -> LedgerResult<usize> {
        let removed = self.handle.write(|tx| {
            require_event(tx, id)?;
            let mut removed = 0;
            for domain in Domain::ALL {
                if RotationLedger::new(tx, domain)
                    .remove_for_event(id)?
                    .is_some()
                {
                    removed += 1;
                }
            }
            SqliteEventRepository::new(tx).delete_event(id)?;
            Ok(removed)
        })?;

        info!(
            "event=event_delete module=events status=ok tenant={} event={} removed_records={}",
            self.handle.tenant_id(),
            id,
            removed
        );
        Ok(removed)
    }
}

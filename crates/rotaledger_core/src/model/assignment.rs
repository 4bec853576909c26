//! Assignment record model.

use crate::model::candidate::CandidateId;
use crate::model::domain::Domain;
use crate::model::event::EventId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable assignment record identifier.
pub type AssignmentId = Uuid;

/// Immutable fact: `candidate_id` received the `domain` award at `event_id`.
///
/// At most one record exists per `(event_id, domain)`. Reassignment deletes
/// the prior record and writes a new one with a new id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: AssignmentId,
    pub domain: Domain,
    pub event_id: EventId,
    pub candidate_id: CandidateId,
    /// Epoch milliseconds.
    pub assigned_at: i64,
    /// Whether the fairness gate was bypassed for this write.
    pub forced: bool,
}

//! Core use-case services.
//!
//! # Responsibility
//! - Turn repository and ledger calls into transactional use-cases over one
//!   tenant's [`crate::tenant::store::StoreHandle`].
//!
//! # Invariants
//! - Each mutating use-case is exactly one `StoreHandle::write` call.
//! - Assignment records are created only by [`assignment_coordinator`].

pub mod assignment_coordinator;
pub mod event_service;
pub mod roster_service;

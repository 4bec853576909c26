//! Core domain logic for rotaledger.
//! Tenant-isolated award rotation: every read and write goes through one
//! tenant's store handle, and the fairness gate lives in this crate only.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod rotation;
pub mod service;
pub mod tenant;

pub use config::{ConfigError, LedgerConfig};
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::assignment::{AssignmentId, AssignmentRecord};
pub use model::candidate::{Candidate, CandidateId};
pub use model::domain::Domain;
pub use model::event::{Event, EventDraft, EventId};
pub use model::validation::ValidationError;
pub use rotation::eligibility::{Eligibility, RotationStatus};
pub use service::assignment_coordinator::{AggregateDrift, AssignOptions, AssignmentCoordinator};
pub use service::event_service::EventService;
pub use service::roster_service::RosterService;
pub use tenant::capability::{Capability, CapabilityError, CapabilitySet};
pub use tenant::principal::{Principal, TenantId};
pub use tenant::registry::{RegistryOptions, StorageLocation, StoreRegistry};
pub use tenant::resolver::{
    AccountDirectory, AccountState, StaticAccountDirectory, TenantContext, TenantContextResolver,
};
pub use tenant::store::StoreHandle;

/// Minimal health-check API for probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Principal to tenant store routing.
//!
//! # Responsibility
//! - Decide which tenant a principal operates on.
//! - Refuse unknown and disabled accounts before any store is opened.
//! - Attach the principal's capability set to the resolved context.
//!
//! # Invariants
//! - The resolver never enforces capabilities; callers check them through
//!   [`TenantContext::ensure`] before mutating.
//! - Two principals resolving to different tenants never share a handle.

use crate::error::{LedgerError, LedgerResult};
use crate::tenant::capability::{Capability, CapabilityError, CapabilitySet};
use crate::tenant::principal::{Principal, TenantId};
use crate::tenant::registry::StoreRegistry;
use crate::tenant::store::StoreHandle;
use log::{info, warn};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;

/// Lifecycle state of an owner account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Active,
    Disabled,
}

/// Source of truth for which owner accounts exist.
pub trait AccountDirectory: Send + Sync {
    /// `None` when no account owns `tenant`.
    fn account_state(&self, tenant: &TenantId) -> Option<AccountState>;
}

/// In-process account directory.
#[derive(Debug, Default)]
pub struct StaticAccountDirectory {
    accounts: Mutex<HashMap<TenantId, AccountState>>,
}

impl StaticAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or re-activates) an owner account.
    pub fn register(&self, tenant: TenantId) {
        self.accounts().insert(tenant, AccountState::Active);
    }

    /// Marks an account disabled. Returns `false` for unknown tenants.
    pub fn disable(&self, tenant: &TenantId) -> bool {
        match self.accounts().get_mut(tenant) {
            Some(state) => {
                *state = AccountState::Disabled;
                true
            }
            None => false,
        }
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<TenantId, AccountState>> {
        self.accounts.lock()
    }
}

impl AccountDirectory for StaticAccountDirectory {
    fn account_state(&self, tenant: &TenantId) -> Option<AccountState> {
        self.accounts().get(tenant).copied()
    }
}

/// Resolved routing target for one request.
#[derive(Debug, Clone)]
pub struct TenantContext {
    handle: StoreHandle,
    capabilities: CapabilitySet,
}

impl TenantContext {
    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    pub fn tenant_id(&self) -> &TenantId {
        self.handle.tenant_id()
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn ensure(&self, capability: Capability) -> Result<(), CapabilityError> {
        self.capabilities.ensure(capability)
    }
}

/// Maps principals to tenant contexts.
pub struct TenantContextResolver {
    registry: Arc<StoreRegistry>,
    directory: Arc<dyn AccountDirectory>,
}

impl TenantContextResolver {
    pub fn new(registry: Arc<StoreRegistry>, directory: Arc<dyn AccountDirectory>) -> Self {
        Self {
            registry,
            directory,
        }
    }

    pub fn registry(&self) -> &Arc<StoreRegistry> {
        &self.registry
    }

    /// Resolves `principal` to its tenant's store and capability set.
    ///
    /// # Errors
    /// - `TenantNotFound` when the owner account is unknown or disabled.
    /// - `StorageCorruption` / `Storage` when the store cannot be opened.
    pub fn resolve(&self, principal: &Principal) -> LedgerResult<TenantContext> {
        let tenant = principal.tenant_id();
        let principal_kind = match principal {
            Principal::Owner { .. } => "owner",
            Principal::Delegate { .. } => "delegate",
        };

        match self.directory.account_state(tenant) {
            Some(AccountState::Active) => {}
            state => {
                warn!(
                    "event=tenant_resolve module=resolver status=rejected principal={} tenant={} account={}",
                    principal_kind,
                    tenant,
                    if state.is_some() { "disabled" } else { "unknown" }
                );
                return Err(LedgerError::TenantNotFound(tenant.clone()));
            }
        }

        let handle = self.registry.get_or_create(tenant)?;
        let capabilities = principal.capabilities();
        info!(
            "event=tenant_resolve module=resolver status=ok principal={} tenant={} capabilities={}",
            principal_kind,
            tenant,
            capabilities
                .iter()
                .map(Capability::as_str)
                .collect::<Vec<_>>()
                .join(",")
        );
        Ok(TenantContext {
            handle,
            capabilities,
        })
    }
}

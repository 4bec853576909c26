//! Tenant identifiers and authenticated principals.

use crate::model::validation::{is_valid_tenant_id, ValidationError};
use crate::tenant::capability::CapabilitySet;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Isolated data scope owned by one account.
///
/// Always a lowercase slug, so it is safe to embed in a store file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parses a tenant slug.
    ///
    /// # Errors
    /// - Returns `ValidationError::InvalidTenantId` unless the value matches
    ///   `[a-z0-9][a-z0-9_-]{0,63}`.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if is_valid_tenant_id(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ValidationError::InvalidTenantId(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

/// Authenticated caller, as handed over by the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Account owner acting on its own tenant with every capability.
    Owner { tenant_id: TenantId },
    /// Account acting on an owner's tenant with a restricted capability set.
    Delegate {
        delegate_id: String,
        owner: TenantId,
        capabilities: CapabilitySet,
    },
}

impl Principal {
    pub fn owner(tenant_id: TenantId) -> Self {
        Self::Owner { tenant_id }
    }

    pub fn delegate(
        delegate_id: impl Into<String>,
        owner: TenantId,
        capabilities: CapabilitySet,
    ) -> Self {
        Self::Delegate {
            delegate_id: delegate_id.into(),
            owner,
            capabilities,
        }
    }

    /// The tenant whose data this principal operates on.
    pub fn tenant_id(&self) -> &TenantId {
        match self {
            Self::Owner { tenant_id } => tenant_id,
            Self::Delegate { owner, .. } => owner,
        }
    }

    /// Capabilities carried alongside the resolved store handle.
    pub fn capabilities(&self) -> CapabilitySet {
        match self {
            Self::Owner { .. } => CapabilitySet::all(),
            Self::Delegate { capabilities, .. } => capabilities.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Principal, TenantId};
    use crate::tenant::capability::{Capability, CapabilitySet};

    #[test]
    fn tenant_id_trims_and_validates() {
        assert_eq!(
            TenantId::parse(" guild-7 ").expect("valid slug").as_str(),
            "guild-7"
        );
        assert!(TenantId::parse("Guild 7").is_err());
        assert!(TenantId::parse("../etc").is_err());
    }

    #[test]
    fn tenant_id_deserialization_applies_validation() {
        let ok: TenantId = serde_json::from_str("\"alpha\"").expect("valid tenant json");
        assert_eq!(ok.as_str(), "alpha");
        assert!(serde_json::from_str::<TenantId>("\"NOT OK\"").is_err());
    }

    #[test]
    fn delegate_resolves_to_owner_tenant_with_its_own_capabilities() {
        let owner = TenantId::parse("owner-1").expect("valid slug");
        let delegate = Principal::delegate(
            "helper",
            owner.clone(),
            CapabilitySet::from_iter([Capability::View]),
        );
        assert_eq!(delegate.tenant_id(), &owner);
        assert!(delegate.capabilities().contains(Capability::View));
        assert!(!delegate.capabilities().contains(Capability::Assign));

        let principal = Principal::owner(owner);
        assert_eq!(principal.capabilities(), CapabilitySet::all());
    }
}

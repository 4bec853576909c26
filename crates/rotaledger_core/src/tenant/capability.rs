//! Capability declarations attached to a resolved tenant context.
//!
//! The resolver only carries capabilities; the calling layer checks them
//! before invoking mutating operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Right a principal may hold on a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read rosters, events, history, and eligibility.
    View,
    /// Write assignments.
    Assign,
    /// Create, rename, exclude, and delete candidates and events; reset.
    Manage,
}

/// String value for view capability.
pub const CAPABILITY_VIEW: &str = "view";
/// String value for assign capability.
pub const CAPABILITY_ASSIGN: &str = "assign";
/// String value for manage capability.
pub const CAPABILITY_MANAGE: &str = "manage";

impl Capability {
    pub const ALL: [Capability; 3] = [Capability::View, Capability::Assign, Capability::Manage];

    /// Stable string id.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => CAPABILITY_VIEW,
            Self::Assign => CAPABILITY_ASSIGN,
            Self::Manage => CAPABILITY_MANAGE,
        }
    }
}

/// Parses one capability from its stable string id.
pub fn parse_capability(value: &str) -> Result<Capability, CapabilityError> {
    match value.trim() {
        "" => Err(CapabilityError::EmptyCapability),
        CAPABILITY_VIEW => Ok(Capability::View),
        CAPABILITY_ASSIGN => Ok(Capability::Assign),
        CAPABILITY_MANAGE => Ok(Capability::Manage),
        other => Err(CapabilityError::UnsupportedCapability(other.to_string())),
    }
}

/// Ordered set of capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    /// Parses a list of stable string ids, rejecting unknown values.
    pub fn parse<'a>(values: impl IntoIterator<Item = &'a str>) -> Result<Self, CapabilityError> {
        values.into_iter().map(parse_capability).collect()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn insert(&mut self, capability: Capability) -> bool {
        self.0.insert(capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fails with `Denied` when `capability` is absent.
    pub fn ensure(&self, capability: Capability) -> Result<(), CapabilityError> {
        if self.contains(capability) {
            Ok(())
        } else {
            Err(CapabilityError::Denied(capability))
        }
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Capability parse and check errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    EmptyCapability,
    UnsupportedCapability(String),
    Denied(Capability),
}

impl Display for CapabilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCapability => write!(f, "capability value must not be empty"),
            Self::UnsupportedCapability(value) => write!(f, "capability is unsupported: {value}"),
            Self::Denied(capability) => {
                write!(f, "capability `{}` is required", capability.as_str())
            }
        }
    }
}

impl Error for CapabilityError {}

#[cfg(test)]
mod tests {
    use super::{parse_capability, Capability, CapabilityError, CapabilitySet};

    #[test]
    fn parses_supported_capabilities() {
        assert_eq!(parse_capability("view").expect("view"), Capability::View);
        assert_eq!(parse_capability(" assign ").expect("assign"), Capability::Assign);
        assert_eq!(parse_capability("manage").expect("manage"), Capability::Manage);
    }

    #[test]
    fn rejects_empty_and_unknown_values() {
        assert_eq!(
            parse_capability("  ").expect_err("empty must fail"),
            CapabilityError::EmptyCapability
        );
        assert_eq!(
            parse_capability("Manage").expect_err("case-sensitive"),
            CapabilityError::UnsupportedCapability("Manage".to_string())
        );
    }

    #[test]
    fn set_parse_is_all_or_nothing() {
        let set = CapabilitySet::parse(["view", "assign", "view"]).expect("valid list");
        assert_eq!(set.iter().count(), 2);
        assert!(CapabilitySet::parse(["view", "admin"]).is_err());
    }

    #[test]
    fn ensure_reports_missing_capability() {
        let set = CapabilitySet::from_iter([Capability::View]);
        assert!(set.ensure(Capability::View).is_ok());
        assert_eq!(
            set.ensure(Capability::Manage).expect_err("manage missing"),
            CapabilityError::Denied(Capability::Manage)
        );
    }

    #[test]
    fn serializes_as_string_list() {
        let json = serde_json::to_string(&CapabilitySet::all()).expect("serialize set");
        assert_eq!(json, r#"["view","assign","manage"]"#);
    }
}

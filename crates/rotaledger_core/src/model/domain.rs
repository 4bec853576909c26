//! Award domains.

use serde::{Deserialize, Serialize};

/// One of the two independent award categories.
///
/// Each domain owns its own candidate table and assignment table inside a
/// tenant store, so rotations never interact across domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Most valuable player, awarded over roster members.
    Mvp,
    /// Winning group, awarded over groups.
    Winner,
}

impl Domain {
    /// All domains in stable order.
    pub const ALL: [Domain; 2] = [Domain::Mvp, Domain::Winner];

    /// Stable string id.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mvp => "mvp",
            Self::Winner => "winner",
        }
    }

    /// Parses the stable string id.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "mvp" => Some(Self::Mvp),
            "winner" => Some(Self::Winner),
            _ => None,
        }
    }

    pub(crate) fn candidate_table(self) -> &'static str {
        match self {
            Self::Mvp => "mvp_candidates",
            Self::Winner => "winner_candidates",
        }
    }

    pub(crate) fn assignment_table(self) -> &'static str {
        match self {
            Self::Mvp => "mvp_assignments",
            Self::Winner => "winner_assignments",
        }
    }

    pub(crate) fn event_filled_column(self) -> &'static str {
        match self {
            Self::Mvp => "mvp_filled",
            Self::Winner => "winner_filled",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Domain;

    #[test]
    fn parse_accepts_stable_ids_only() {
        assert_eq!(Domain::parse("mvp"), Some(Domain::Mvp));
        assert_eq!(Domain::parse(" winner "), Some(Domain::Winner));
        assert_eq!(Domain::parse("MVP"), None);
    }

    #[test]
    fn domains_use_disjoint_tables() {
        assert_ne!(
            Domain::Mvp.candidate_table(),
            Domain::Winner.candidate_table()
        );
        assert_ne!(
            Domain::Mvp.assignment_table(),
            Domain::Winner.assignment_table()
        );
    }
}

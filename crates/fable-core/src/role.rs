//! Narrative role types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The narrative slot a participant fills for one round.
///
/// The set is closed: every round's story is built from exactly these slots,
/// in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    /// Where the story takes place.
    Location,
    /// Who the story is about.
    Character,
    /// The initial complication.
    Complication,
    /// How things get worse.
    Escalation,
    /// How it ends.
    Resolution,
}

impl RoleType {
    /// All role types in narrative order.
    pub const ALL: [Self; 5] = [
        Self::Location,
        Self::Character,
        Self::Complication,
        Self::Escalation,
        Self::Resolution,
    ];

    /// Number of role types.
    pub const COUNT: usize = Self::ALL.len();

    /// Stable identifier, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Character => "character",
            Self::Complication => "complication",
            Self::Escalation => "escalation",
            Self::Resolution => "resolution",
        }
    }

    /// Prompt shown on a blank custom card dealt for this role.
    #[must_use]
    pub const fn custom_prompt(self) -> &'static str {
        match self {
            Self::Location => "Describe a place",
            Self::Character => "Describe someone",
            Self::Complication => "What goes wrong?",
            Self::Escalation => "How does it get worse?",
            Self::Resolution => "How does it end?",
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

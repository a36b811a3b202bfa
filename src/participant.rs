// 🏸 Participant - Roster member identity + rotation counters
// Identity is the id; name and flags are values that collaborators change between rounds

use serde::{Deserialize, Serialize};

/// A roster member.
///
/// `sit_out_count` is only ever changed by the round orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Stable identity (UUID v4 for newly registered participants)
    pub id: String,

    /// Display name
    pub name: String,

    /// Checked in for this session
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Taking a break; stays on the roster but skips rounds
    #[serde(default)]
    pub is_paused: bool,

    /// How many rounds this participant has sat out
    #[serde(default)]
    pub sit_out_count: u32,
}

fn default_true() -> bool {
    true
}

impl Participant {
    /// Register a new participant with a fresh UUID
    pub fn new(name: impl Into<String>) -> Self {
        Participant {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            is_active: true,
            is_paused: false,
            sit_out_count: 0,
        }
    }

    /// Participant with a caller-chosen id (storage reloads, tests)
    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Participant {
            id: id.into(),
            ..Participant::new(name)
        }
    }

    /// Active and not paused: takes part in the next round's draw
    pub fn is_eligible(&self) -> bool {
        self.is_active && !self.is_paused
    }

    pub fn status_label(&self) -> &'static str {
        match (self.is_active, self.is_paused) {
            (false, _) => "Inactive",
            (true, true) => "Paused",
            (true, false) => "Active",
        }
    }
}

/// Filter a roster down to the eligible pool, preserving roster order
pub fn eligible_pool(participants: &[Participant]) -> Vec<Participant> {
    participants
        .iter()
        .filter(|p| p.is_eligible())
        .cloned()
        .collect()
}

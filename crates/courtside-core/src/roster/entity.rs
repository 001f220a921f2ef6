use serde::{Deserialize, Serialize};

/// Team label for players whose team pointer is NUL.
pub const FREE_AGENTS: &str = "Free Agents";

/// One player record discovered by a scan.
///
/// The record pointer stays crate-private: consumers address players by
/// table index only, and index stability between a scan and a later write
/// is their contract to keep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Slot index within the player table.
    pub index: usize,
    pub first_name: String,
    pub last_name: String,
    pub team_name: String,
    /// Team table index, when the team pointer aligned with the table.
    pub team_index: Option<usize>,
    #[serde(skip)]
    pub(crate) record_ptr: u64,
}

impl Player {
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            format!("Player {}", self.index)
        } else {
            name.to_string()
        }
    }
}

/// One team discovered by a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// Slot index within the team table; absent when the team was inferred
    /// from player records rather than the table itself.
    pub index: Option<usize>,
    pub name: String,
}

/// Externally supplied roster row, used when live access is unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalPlayer {
    pub index: usize,
    pub first_name: String,
    pub last_name: String,
    pub team_name: String,
}

/// Which rung of the fallback ladder produced the current roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum RosterSource {
    /// Team records' roster slot pointers, dereferenced to players.
    TeamRosters,
    /// Sequential walk of the player table.
    SequentialScan,
    /// Externally supplied static data.
    External,
    /// Nothing available.
    Empty,
}

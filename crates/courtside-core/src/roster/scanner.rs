//! Table discovery scans.
//!
//! Two live strategies, tried in order by the roster model: walk the team
//! records' roster slot pointers, then brute-force the player table
//! sequentially. Both swallow per-record failures and fail as a whole only
//! by producing nothing (or, for the sequential scan, by tripping the
//! corruption heuristic, which means the resolved base was a false
//! positive).

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::ReadMemory;
use crate::roster::entity::{FREE_AGENTS, Player, Team};
use crate::schema::{Schema, TableKind};

/// Heuristics separating a real roster from a misresolved table.
///
/// The allow-list and threshold are judgment calls inherited from reverse
/// engineering; override them per title build if they reject too much.
#[derive(Debug, Clone)]
pub struct ScanPolicy {
    /// Characters a believable player name is made of.
    pub allowed_name_chars: String,
    /// Discard a whole sequential scan when the share of names violating
    /// the allow-list strictly exceeds this fraction.
    pub corruption_threshold: f64,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            allowed_name_chars:
                "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ -'.".to_string(),
            corruption_threshold: 0.5,
        }
    }
}

impl ScanPolicy {
    /// Whether a decoded name consists only of allow-listed characters.
    pub fn name_is_clean(&self, name: &str) -> bool {
        name.chars().all(|c| self.allowed_name_chars.contains(c))
    }

    /// Whether `suspect` violations out of `scanned` names condemns the scan.
    pub fn is_corrupt(&self, suspect: usize, scanned: usize) -> bool {
        scanned > 0 && (suspect as f64) > self.corruption_threshold * scanned as f64
    }
}

/// Printable-ASCII check used for end-of-table detection.
pub(crate) fn is_printable(text: &str) -> bool {
    text.chars().all(|c| (' '..='~').contains(&c))
}

#[derive(Debug, Default)]
pub(crate) struct ScanOutcome {
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
}

pub(crate) struct Scanner<'a, M> {
    pub mem: &'a M,
    pub schema: &'a Schema,
    pub policy: &'a ScanPolicy,
    pub player_base: Option<u64>,
    pub team_base: Option<u64>,
}

impl<M: ReadMemory> Scanner<'_, M> {
    /// Read the first/last name pair of a player record. `None` when the
    /// record is unreadable or the schema defines no name fields.
    fn read_player_names(&self, record: u64) -> Option<(String, String)> {
        let names = &self.schema.names;
        if names.first_name.is_none() && names.last_name.is_none() {
            return None;
        }
        let read = |slot: Option<crate::schema::TextField>| -> Option<String> {
            match slot {
                Some(field) => self
                    .mem
                    .read_string(record + field.offset, field.max_chars, field.encoding)
                    .ok()
                    .map(|s| s.trim().to_string()),
                None => Some(String::new()),
            }
        };
        let first = read(names.first_name)?;
        let last = read(names.last_name)?;
        Some((first, last))
    }

    /// Walk the team table reading one name per stride. The first empty or
    /// non-printable name is the end-of-table sentinel.
    pub fn scan_teams(&self) -> Vec<Team> {
        let Some(base) = self.team_base else {
            return Vec::new();
        };
        let stride = self.schema.team.stride;
        let Some(name_field) = self.schema.names.team_name else {
            return Vec::new();
        };
        if stride == 0 {
            return Vec::new();
        }

        let mut teams = Vec::new();
        for index in 0..self.schema.team.max_records {
            let record = base + index as u64 * stride;
            let name = match self.mem.read_string(
                record + name_field.offset,
                name_field.max_chars,
                name_field.encoding,
            ) {
                Ok(name) => name.trim().to_string(),
                Err(_) => break,
            };
            if name.is_empty() || !is_printable(&name) {
                break;
            }
            teams.push(Team {
                index: Some(index),
                name,
            });
        }
        debug!("Team table scan found {} teams", teams.len());
        teams
    }

    /// Roster-pointer scan: dereference each team's roster slots directly to
    /// player records; a player's index is its distance from the table base
    /// in strides.
    pub fn scan_via_rosters(&self) -> Result<ScanOutcome> {
        let player_base = self
            .player_base
            .ok_or(Error::ResolutionFailed(TableKind::Player))?;
        let team_base = self
            .team_base
            .ok_or(Error::ResolutionFailed(TableKind::Team))?;
        let player_stride = self.schema.player.stride;
        let team_stride = self.schema.team.stride;
        let slots = self.schema.names.roster_slots;
        if player_stride == 0 || slots == 0 {
            return Err(Error::ResolutionFailed(TableKind::Player));
        }
        if team_stride == 0 {
            return Err(Error::ResolutionFailed(TableKind::Team));
        }

        let teams = self.scan_teams();
        if teams.is_empty() {
            return Ok(ScanOutcome::default());
        }

        let mut players = Vec::new();
        let mut seen = HashSet::new();
        for team in &teams {
            let record = team_base + team.index.unwrap_or(0) as u64 * team_stride;
            for slot in 0..slots {
                let ptr = match self.mem.read_u64(record + slot as u64 * 8) {
                    Ok(ptr) if ptr != 0 => ptr,
                    _ => continue,
                };
                if !seen.insert(ptr) {
                    continue;
                }
                let Some((first, last)) = self.read_player_names(ptr) else {
                    continue;
                };
                if first.is_empty() && last.is_empty() {
                    continue;
                }
                if !is_printable(&first) || !is_printable(&last) {
                    continue;
                }
                let index = ptr
                    .checked_sub(player_base)
                    .filter(|delta| delta % player_stride == 0)
                    .map(|delta| (delta / player_stride) as usize)
                    .unwrap_or(players.len());
                players.push(Player {
                    index,
                    first_name: first,
                    last_name: last,
                    team_name: team.name.clone(),
                    team_index: team.index,
                    record_ptr: ptr,
                });
            }
        }

        debug!(
            "Roster-pointer scan found {} players across {} teams",
            players.len(),
            teams.len()
        );
        Ok(ScanOutcome { players, teams })
    }

    /// Sequential scan: walk `0..max_records` by stride, skipping blank and
    /// unreadable slots, resolving each record's team through its team
    /// pointer. Teams come from the distinct resolved names, not from the
    /// pointer structure.
    pub fn scan_sequential(&self) -> Result<ScanOutcome> {
        let base = self
            .player_base
            .ok_or(Error::ResolutionFailed(TableKind::Player))?;
        let stride = self.schema.player.stride;
        if stride == 0 {
            return Err(Error::ResolutionFailed(TableKind::Player));
        }

        let mut players = Vec::new();
        let mut scanned = 0usize;
        let mut suspect = 0usize;
        for index in 0..self.schema.player.max_records {
            let record = base + index as u64 * stride;
            let Some((first, last)) = self.read_player_names(record) else {
                continue;
            };
            if first.is_empty() && last.is_empty() {
                continue;
            }
            scanned += 1;
            let combined = format!("{first}{last}");
            if !self.policy.name_is_clean(&combined) {
                suspect += 1;
                continue;
            }
            let (team_name, team_index) = self.resolve_player_team(record);
            players.push(Player {
                index,
                first_name: first,
                last_name: last,
                team_name,
                team_index,
                record_ptr: record,
            });
        }

        if self.policy.is_corrupt(suspect, scanned) {
            // The resolved base was a structurally valid false positive.
            return Err(Error::CorruptScan(format!(
                "{}/{} scanned names outside the allow-list",
                suspect, scanned
            )));
        }

        let teams = teams_from_players(&players);
        debug!(
            "Sequential scan found {} players, {} distinct teams ({} suspect names)",
            players.len(),
            teams.len(),
            suspect
        );
        Ok(ScanOutcome { players, teams })
    }

    /// Resolve a player's team from its per-record team pointer.
    fn resolve_player_team(&self, record: u64) -> (String, Option<usize>) {
        let Some(ptr_offset) = self.schema.names.team_ptr_offset else {
            return ("Unknown".to_string(), None);
        };
        match self.mem.read_u64(record + ptr_offset) {
            Ok(0) => (FREE_AGENTS.to_string(), None),
            Ok(team_ptr) => {
                let mut name = "Unknown".to_string();
                if let Some(field) = self.schema.names.team_name {
                    if let Ok(read) = self.mem.read_string(
                        team_ptr + field.offset,
                        field.max_chars,
                        field.encoding,
                    ) {
                        let read = read.trim();
                        if !read.is_empty() && is_printable(read) {
                            name = read.to_string();
                        }
                    }
                }
                let index = self.team_base.and_then(|base| {
                    let stride = self.schema.team.stride;
                    if stride == 0 {
                        return None;
                    }
                    team_ptr
                        .checked_sub(base)
                        .filter(|delta| delta % stride == 0)
                        .map(|delta| (delta / stride) as usize)
                });
                (name, index)
            }
            Err(_) => ("Unknown".to_string(), None),
        }
    }
}

/// Distinct team names in first-appearance order.
fn teams_from_players(players: &[Player]) -> Vec<Team> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut teams = Vec::new();
    for player in players {
        if player.team_name == "Unknown" {
            continue;
        }
        if !seen.insert(&player.team_name) {
            continue;
        }
        teams.push(Team {
            index: player.team_index,
            name: player.team_name.clone(),
        });
    }
    // Free agents sort to the front, matching the display convention.
    teams.sort_by_key(|t| (t.name != FREE_AGENTS, t.index.unwrap_or(usize::MAX)));
    teams
}

//! Live roster model: resolved table bases, scanned entities and the
//! field-level read/write API.
//!
//! Not internally thread-safe. At most one `refresh` may be in flight at a
//! time; overlapping refreshes race on the resolved-base cache and can hand
//! inconsistent bases to concurrent readers. A fully populated model is
//! safe for concurrent read-only use. Memory transfers are synchronous OS
//! calls with no timeout — a suspended target blocks the calling thread, so
//! keep refreshes off any interactive thread.

mod entity;
mod scanner;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::codec;
use crate::memory::{AttachProcess, ReadMemory, WriteMemory};
use crate::resolve::{ResolvedBases, resolve_first};
use crate::schema::{FieldDescriptor, Schema, TableKind, TextField};

pub use entity::{ExternalPlayer, FREE_AGENTS, Player, RosterSource, Team};
pub use scanner::ScanPolicy;

use scanner::{ScanOutcome, Scanner, is_printable};

/// Schema-driven accessor over the target's player and team tables.
pub struct Roster<M> {
    schema: Arc<Schema>,
    mem: M,
    policy: ScanPolicy,
    bases: ResolvedBases,
    players: Vec<Player>,
    teams: Vec<Team>,
    name_index: HashMap<String, Vec<usize>>,
    external: Option<Vec<ExternalPlayer>>,
    source: RosterSource,
}

impl<M> Roster<M>
where
    M: ReadMemory + WriteMemory + AttachProcess,
{
    pub fn new(schema: Arc<Schema>, mem: M) -> Self {
        Self {
            schema,
            mem,
            policy: ScanPolicy::default(),
            bases: ResolvedBases::default(),
            players: Vec::new(),
            teams: Vec::new(),
            name_index: HashMap::new(),
            external: None,
            source: RosterSource::Empty,
        }
    }

    pub fn with_policy(mut self, policy: ScanPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn source(&self) -> RosterSource {
        self.source
    }

    /// Provide a static roster used when live access is unavailable.
    pub fn set_external_roster(&mut self, entries: Vec<ExternalPlayer>) {
        self.external = Some(entries);
    }

    /// All player indices whose full name matches `name`, ignoring case and
    /// whitespace differences.
    pub fn find_players_by_name(&self, name: &str) -> Vec<usize> {
        self.name_index
            .get(&normalize_name(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Drop every cached base and scan result, then re-resolve and rescan.
    ///
    /// Falls through discovery strategies until one produces entities:
    /// team roster pointers, sequential table scan, externally supplied
    /// data, empty. Returns the strategy that terminated the ladder.
    pub fn refresh(&mut self) -> RosterSource {
        self.invalidate();

        if let Err(e) = self.mem.attach() {
            warn!("Live roster access unavailable: {}", e);
            return self.adopt_fallback();
        }

        let player_base = self.resolve_base(TableKind::Player);
        let team_base = self.resolve_base(TableKind::Team);

        let schema = self.schema.clone();
        let outcome = {
            let scanner = Scanner {
                mem: &self.mem,
                schema: &schema,
                policy: &self.policy,
                player_base,
                team_base,
            };
            // A state fails by producing zero usable entities (or a clean
            // error signal); either way the ladder just moves on.
            let via_rosters = match scanner.scan_via_rosters() {
                Ok(outcome) if !outcome.players.is_empty() => {
                    Some((outcome, RosterSource::TeamRosters))
                }
                Ok(_) => None,
                Err(e) => {
                    debug!("Team-roster scan unavailable: {}", e);
                    None
                }
            };
            match via_rosters {
                Some(found) => Some(found),
                None => match scanner.scan_sequential() {
                    Ok(outcome) if !outcome.players.is_empty() => {
                        Some((outcome, RosterSource::SequentialScan))
                    }
                    Ok(_) => None,
                    Err(e) => {
                        warn!("Sequential scan failed: {}", e);
                        None
                    }
                },
            }
        };

        match outcome {
            Some((outcome, source)) => {
                self.adopt(outcome, source);
                self.source
            }
            None => self.adopt_fallback(),
        }
    }

    /// Read one field of one player as its raw integer value.
    pub fn player_field(&mut self, index: usize, field: &FieldDescriptor) -> Option<u64> {
        let record = self.record_address(TableKind::Player, index)?;
        codec::read_field(&self.mem, record, field)
    }

    /// Write one field of one player. The write happens only after the
    /// base and any dereference component have resolved.
    pub fn set_player_field(&mut self, index: usize, field: &FieldDescriptor, value: u64) -> bool {
        let Some(record) = self.record_address(TableKind::Player, index) else {
            return false;
        };
        codec::write_field(&self.mem, record, field, value)
    }

    /// Read one field of one team as its raw integer value.
    pub fn team_field(&mut self, index: usize, field: &FieldDescriptor) -> Option<u64> {
        let record = self.record_address(TableKind::Team, index)?;
        codec::read_field(&self.mem, record, field)
    }

    /// Write one field of one team.
    pub fn set_team_field(&mut self, index: usize, field: &FieldDescriptor, value: u64) -> bool {
        let Some(record) = self.record_address(TableKind::Team, index) else {
            return false;
        };
        codec::write_field(&self.mem, record, field, value)
    }

    /// Read a player's first and last name.
    pub fn player_name(&mut self, index: usize) -> Option<(String, String)> {
        let record = self.record_address(TableKind::Player, index)?;
        let read = |field: Option<TextField>| -> Option<String> {
            match field {
                Some(f) => self
                    .mem
                    .read_string(record + f.offset, f.max_chars, f.encoding)
                    .ok()
                    .map(|s| s.trim().to_string()),
                None => Some(String::new()),
            }
        };
        let first = read(self.schema.names.first_name)?;
        let last = read(self.schema.names.last_name)?;
        Some((first, last))
    }

    /// Overwrite a player's name slots.
    pub fn rename_player(&mut self, index: usize, first: &str, last: &str) -> bool {
        let Some(record) = self.record_address(TableKind::Player, index) else {
            return false;
        };
        let mut wrote = false;
        for (field, value) in [
            (self.schema.names.first_name, first),
            (self.schema.names.last_name, last),
        ] {
            if let Some(f) = field {
                if self
                    .mem
                    .write_string(record + f.offset, value, f.max_chars, f.encoding)
                    .is_err()
                {
                    return false;
                }
                wrote = true;
            }
        }
        wrote
    }

    /// Read a team's display name.
    pub fn team_name(&mut self, index: usize) -> Option<String> {
        let record = self.record_address(TableKind::Team, index)?;
        let field = self.schema.names.team_name?;
        self.mem
            .read_string(record + field.offset, field.max_chars, field.encoding)
            .ok()
            .map(|s| s.trim().to_string())
    }

    /// Overwrite a team's display name.
    pub fn set_team_name(&mut self, index: usize, name: &str) -> bool {
        let Some(record) = self.record_address(TableKind::Team, index) else {
            return false;
        };
        let Some(field) = self.schema.names.team_name else {
            return false;
        };
        self.mem
            .write_string(record + field.offset, name, field.max_chars, field.encoding)
            .is_ok()
    }

    fn invalidate(&mut self) {
        self.bases.clear();
        self.players.clear();
        self.teams.clear();
        self.name_index.clear();
        self.source = RosterSource::Empty;
    }

    /// Address of record `index`, attaching and resolving the table base on
    /// demand. `None` whenever any component is unavailable.
    fn record_address(&mut self, kind: TableKind, index: usize) -> Option<u64> {
        self.mem.attach().ok()?;
        let (stride, max_records) = {
            let table = self.schema.table(kind);
            (table.stride, table.max_records)
        };
        if stride == 0 || index >= max_records {
            return None;
        }
        let base = self.resolve_base(kind)?;
        Some(base + index as u64 * stride)
    }

    /// Resolve and cache a table base, probing each candidate chain for
    /// plausibility before trusting it.
    fn resolve_base(&mut self, kind: TableKind) -> Option<u64> {
        if let Some(address) = self.bases.get(kind) {
            return Some(address);
        }
        let schema = self.schema.clone();
        let chains = &schema.table(kind).chains;
        let address = resolve_first(&self.mem, kind, chains, |addr| match kind {
            TableKind::Player => probe_player_record(&self.mem, &schema, addr),
            TableKind::Team => probe_team_record(&self.mem, &schema, addr),
        })?;
        self.bases.set(kind, address);
        Some(address)
    }

    fn adopt(&mut self, outcome: ScanOutcome, source: RosterSource) {
        info!(
            "Roster refreshed via {}: {} players, {} teams",
            source,
            outcome.players.len(),
            outcome.teams.len()
        );
        self.players = outcome.players;
        self.teams = outcome.teams;
        self.source = source;
        self.rebuild_name_index();
    }

    /// Terminal rungs of the ladder: external data if present, else empty.
    fn adopt_fallback(&mut self) -> RosterSource {
        if let Some(entries) = self.external.clone().filter(|e| !e.is_empty()) {
            let players: Vec<Player> = entries
                .into_iter()
                .map(|e| Player {
                    index: e.index,
                    first_name: e.first_name,
                    last_name: e.last_name,
                    team_name: e.team_name,
                    team_index: None,
                    record_ptr: 0,
                })
                .collect();
            let teams = distinct_team_names(&players);
            self.adopt(ScanOutcome { players, teams }, RosterSource::External);
        } else {
            debug!("Roster empty: no live access and no external data");
            self.source = RosterSource::Empty;
        }
        self.source
    }

    fn rebuild_name_index(&mut self) {
        self.name_index.clear();
        for player in &self.players {
            self.name_index
                .entry(normalize_name(&player.full_name()))
                .or_default()
                .push(player.index);
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn distinct_team_names(players: &[Player]) -> Vec<Team> {
    let mut teams: Vec<Team> = Vec::new();
    for player in players {
        if player.team_name.is_empty() {
            continue;
        }
        if teams.iter().any(|t| t.name == player.team_name) {
            continue;
        }
        teams.push(Team {
            index: None,
            name: player.team_name.clone(),
        });
    }
    teams
}

/// A player base is plausible when a name probe decodes to non-empty
/// printable text. Accepted blind only when the schema has no name fields
/// to probe with.
fn probe_player_record<M: ReadMemory>(mem: &M, schema: &Schema, address: u64) -> bool {
    let probes = [schema.names.last_name, schema.names.first_name];
    let mut probed = false;
    for field in probes.into_iter().flatten() {
        probed = true;
        if let Ok(text) = mem.read_string(address + field.offset, field.max_chars, field.encoding)
        {
            let text = text.trim();
            if !text.is_empty() && is_printable(text) {
                return true;
            }
        }
    }
    !probed
}

/// A team base must decode a clean team name at its first record.
fn probe_team_record<M: ReadMemory>(mem: &M, schema: &Schema, address: u64) -> bool {
    let Some(field) = schema.names.team_name else {
        return true;
    };
    match mem.read_string(address + field.offset, field.max_chars, field.encoding) {
        Ok(text) => {
            let text = text.trim();
            !text.is_empty() && is_printable(text)
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemory;
    use crate::schema::{
        FieldAccess, FieldDescriptor, FieldKind, NameLayout, PointerChain, TableSpec, TextEncoding,
        TextField,
    };

    const MODULE_BASE: u64 = 0x1400_0000;
    const PLAYER_TABLE: u64 = MODULE_BASE + 0x1000;
    const TEAM_TABLE: u64 = MODULE_BASE + 0x3000;
    const PLAYER_STRIDE: u64 = 0x100;
    const TEAM_STRIDE: u64 = 0x80;

    /// Slot that holds the player-table pointer inside the module image.
    const PLAYER_SLOT: u64 = 0x20;
    /// Slot that holds the team-table pointer inside the module image.
    const TEAM_SLOT: u64 = 0x28;

    const OFF_FIRST: u64 = 0x00;
    const OFF_LAST: u64 = 0x20;
    const OFF_TEAM_PTR: u64 = 0x40;
    const OFF_RATING: u64 = 0x60;
    /// Past the roster slot pointers at the head of a team record.
    const OFF_TEAM_NAME: u64 = 0x60;

    fn text(offset: u64) -> TextField {
        TextField {
            offset,
            max_chars: 12,
            encoding: TextEncoding::Utf16,
        }
    }

    fn test_schema() -> Arc<Schema> {
        let mut schema = Schema {
            process_name: "NBA2K26.exe".to_string(),
            module_name: "NBA2K26.exe".to_string(),
            version: "test".to_string(),
            player: TableSpec {
                stride: PLAYER_STRIDE,
                chains: vec![PointerChain {
                    base: PLAYER_SLOT,
                    ..Default::default()
                }],
                max_records: 16,
            },
            team: TableSpec {
                stride: TEAM_STRIDE,
                chains: vec![PointerChain {
                    base: TEAM_SLOT,
                    ..Default::default()
                }],
                max_records: 8,
            },
            names: NameLayout {
                first_name: Some(text(OFF_FIRST)),
                last_name: Some(text(OFF_LAST)),
                team_name: Some(text(OFF_TEAM_NAME)),
                team_ptr_offset: Some(OFF_TEAM_PTR),
                roster_slots: 3,
            },
            ..Default::default()
        };
        schema.push_field(FieldDescriptor {
            category: "Attributes".to_string(),
            name: "Three Point".to_string(),
            offset: OFF_RATING,
            start_bit: 2,
            length: 7,
            kind: FieldKind::Number,
            access: FieldAccess::Direct,
        });
        Arc::new(schema)
    }

    fn blank_memory() -> MockMemory {
        MockMemory::new(MODULE_BASE, 0x8000).with_base_address(MODULE_BASE)
    }

    fn put_player(mem: &MockMemory, index: u64, first: &str, last: &str) -> u64 {
        let record = PLAYER_TABLE + index * PLAYER_STRIDE;
        mem.patch_wide_string(record + OFF_FIRST, first, 12);
        mem.patch_wide_string(record + OFF_LAST, last, 12);
        record
    }

    fn put_team(mem: &MockMemory, index: u64, name: &str) -> u64 {
        let record = TEAM_TABLE + index * TEAM_STRIDE;
        mem.patch_wide_string(record + OFF_TEAM_NAME, name, 12);
        record
    }

    /// Memory where both table pointers resolve.
    fn live_memory() -> MockMemory {
        let mem = blank_memory();
        mem.patch_u64(MODULE_BASE + PLAYER_SLOT, PLAYER_TABLE);
        mem.patch_u64(MODULE_BASE + TEAM_SLOT, TEAM_TABLE);
        mem
    }

    #[test]
    fn test_roster_pointer_scan_wins_when_structure_intact() {
        let mem = live_memory();
        let lakers = put_team(&mem, 0, "Lakers");
        let celtics = put_team(&mem, 1, "Celtics");
        let p0 = put_player(&mem, 0, "LeBron", "James");
        let p2 = put_player(&mem, 2, "Austin", "Reaves");
        let p4 = put_player(&mem, 4, "Jayson", "Tatum");
        // Roster slots: Lakers carry records 0 and 2, Celtics record 4.
        mem.patch_u64(lakers, p0);
        mem.patch_u64(lakers + 8, p2);
        mem.patch_u64(celtics, p4);
        // A duplicate pointer must not produce a duplicate entity.
        mem.patch_u64(celtics + 16, p4);

        let mut roster = Roster::new(test_schema(), mem);
        assert_eq!(roster.refresh(), RosterSource::TeamRosters);
        assert_eq!(roster.teams().len(), 2);
        assert_eq!(roster.players().len(), 3);

        let indices: Vec<usize> = roster.players().iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 2, 4]);
        let tatum = &roster.players()[2];
        assert_eq!(tatum.team_name, "Celtics");
        assert_eq!(tatum.team_index, Some(1));
    }

    #[test]
    fn test_team_scan_stops_at_first_blank_name() {
        let mem = live_memory();
        put_team(&mem, 0, "Lakers");
        put_team(&mem, 1, "Celtics");
        // Slot 2 left blank: slot 3 must never be reached.
        put_team(&mem, 3, "Ghosts");
        put_player(&mem, 0, "LeBron", "James");
        mem.patch_u64(TEAM_TABLE, PLAYER_TABLE);

        let mut roster = Roster::new(test_schema(), mem);
        roster.refresh();
        assert_eq!(roster.teams().len(), 2);
        assert!(roster.teams().iter().all(|t| t.name != "Ghosts"));
    }

    #[test]
    fn test_sequential_scan_skips_blank_records() {
        let mem = live_memory();
        // No roster slot pointers anywhere: the team-roster scan yields
        // nothing and the ladder falls through to the sequential scan.
        put_team(&mem, 0, "Lakers");
        let lakers = TEAM_TABLE;
        for (index, last) in [(0u64, "Alpha"), (2, "Beta"), (4, "Gamma")] {
            let record = put_player(&mem, index, "Player", last);
            mem.patch_u64(record + OFF_TEAM_PTR, lakers);
        }
        // Odd slots stay blank and must be skipped, not abort the scan.

        let mut roster = Roster::new(test_schema(), mem);
        assert_eq!(roster.refresh(), RosterSource::SequentialScan);
        assert_eq!(roster.players().len(), 3);
        let indices: Vec<usize> = roster.players().iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 2, 4]);
        // Teams derive from resolved names, with table-aligned indices.
        assert_eq!(roster.teams().len(), 1);
        assert_eq!(roster.teams()[0].name, "Lakers");
        assert_eq!(roster.teams()[0].index, Some(0));
    }

    #[test]
    fn test_sequential_scan_null_team_pointer_is_free_agent() {
        let mem = live_memory();
        put_team(&mem, 0, "Lakers");
        put_player(&mem, 0, "Journey", "Man");

        let mut roster = Roster::new(test_schema(), mem);
        roster.refresh();
        assert_eq!(roster.players().len(), 1);
        assert_eq!(roster.players()[0].team_name, FREE_AGENTS);
    }

    #[test]
    fn test_corrupt_scan_discards_everything() {
        let mem = live_memory();
        put_team(&mem, 0, "Lakers");
        // 3 of 5 names violate the allow-list: strictly over 50%.
        put_player(&mem, 0, "Fine", "Name");
        put_player(&mem, 1, "@@@@", "####");
        put_player(&mem, 2, "Also", "Fine");
        put_player(&mem, 3, "12)(", "++--");
        put_player(&mem, 4, "%%%%", "&&&&");

        let mut roster = Roster::new(test_schema(), mem);
        assert_eq!(roster.refresh(), RosterSource::Empty);
        assert!(roster.players().is_empty());
        assert!(roster.teams().is_empty());
    }

    #[test]
    fn test_exactly_half_suspect_is_kept() {
        let mem = live_memory();
        put_team(&mem, 0, "Lakers");
        // 2 of 4: not strictly over the threshold, scan survives.
        put_player(&mem, 0, "Fine", "Name");
        put_player(&mem, 1, "@@@@", "####");
        put_player(&mem, 2, "Also", "Fine");
        put_player(&mem, 3, "%%%%", "&&&&");

        let mut roster = Roster::new(test_schema(), mem);
        assert_eq!(roster.refresh(), RosterSource::SequentialScan);
        assert_eq!(roster.players().len(), 2);
    }

    #[test]
    fn test_ladder_falls_back_to_external_then_empty() {
        // Nothing resolvable in memory at all.
        let mut roster = Roster::new(test_schema(), blank_memory());
        assert_eq!(roster.refresh(), RosterSource::Empty);

        roster.set_external_roster(vec![
            ExternalPlayer {
                index: 0,
                first_name: "Michael".to_string(),
                last_name: "Jordan".to_string(),
                team_name: "Bulls".to_string(),
            },
            ExternalPlayer {
                index: 1,
                first_name: "Scottie".to_string(),
                last_name: "Pippen".to_string(),
                team_name: "Bulls".to_string(),
            },
        ]);
        assert_eq!(roster.refresh(), RosterSource::External);
        assert_eq!(roster.players().len(), 2);
        assert_eq!(roster.teams().len(), 1);
        assert_eq!(roster.find_players_by_name("michael jordan"), vec![0]);
    }

    #[test]
    fn test_field_roundtrip_through_roster() {
        let mem = live_memory();
        put_team(&mem, 0, "Lakers");
        put_player(&mem, 0, "LeBron", "James");

        let schema = test_schema();
        let field = schema.field("Attributes", "Three Point").unwrap().clone();
        let mut roster = Roster::new(schema, mem);
        roster.refresh();

        assert!(roster.set_player_field(0, &field, 101));
        assert_eq!(roster.player_field(0, &field), Some(101));
        // Out-of-table indices never resolve to an address.
        assert_eq!(roster.player_field(99, &field), None);
        assert!(!roster.set_player_field(99, &field, 1));
    }

    #[test]
    fn test_rename_player_roundtrip() {
        let mem = live_memory();
        put_team(&mem, 0, "Lakers");
        put_player(&mem, 0, "LeBron", "James");

        let mut roster = Roster::new(test_schema(), mem);
        roster.refresh();
        assert!(roster.rename_player(0, "Bronny", "James"));
        assert_eq!(
            roster.player_name(0),
            Some(("Bronny".to_string(), "James".to_string()))
        );
    }

    #[test]
    fn test_team_name_roundtrip() {
        let mem = live_memory();
        put_team(&mem, 0, "Lakers");
        put_player(&mem, 0, "LeBron", "James");

        let mut roster = Roster::new(test_schema(), mem);
        roster.refresh();
        assert_eq!(roster.team_name(0), Some("Lakers".to_string()));
        assert!(roster.set_team_name(0, "Minneapolis Lakers"));
        assert_eq!(roster.team_name(0), Some("Minneapolis".to_string()));
    }

    #[test]
    fn test_refresh_invalidates_bases_wholesale() {
        let mem = live_memory();
        put_team(&mem, 0, "Lakers");
        put_player(&mem, 0, "LeBron", "James");

        let mut roster = Roster::new(test_schema(), mem);
        roster.refresh();
        assert_eq!(roster.source(), RosterSource::SequentialScan);

        // Wipe the player-table pointer. The cached base must not survive
        // into the next refresh: the chain now resolves to an address whose
        // probe fails, and the roster comes back empty.
        roster.mem.patch_u64(MODULE_BASE + PLAYER_SLOT, 0xDEAD_0000);
        assert_eq!(roster.refresh(), RosterSource::Empty);
    }
}

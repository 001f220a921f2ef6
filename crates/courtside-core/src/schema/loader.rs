//! Tolerant parser for offset bundles.
//!
//! Bundles are hand-maintained JSON and drift between community revisions:
//! numbers appear as decimal or `"0x"`-prefixed strings, keys come in
//! several spellings, and base pointers are sometimes single chains,
//! sometimes lists of version-specific candidates. Individual entries that
//! cannot be understood are skipped with a warning; only a document that
//! yields no usable definitions at all is an error.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::schema::{
    FieldAccess, FieldDescriptor, FieldKind, Hop, NameLayout, PointerChain, Schema, TableSpec,
    TextEncoding, TextField,
};

/// Scan bound defaults, used when the bundle does not override them.
const DEFAULT_MAX_PLAYERS: usize = 5500;
const DEFAULT_MAX_TEAMS: usize = 400;
const DEFAULT_ROSTER_SLOTS: usize = 30;

const FIRST_NAME_ALIASES: &[&str] = &["first name", "firstname", "first_name", "player_first_name"];
const LAST_NAME_ALIASES: &[&str] = &["last name", "lastname", "last_name", "surname", "player_last_name"];
const TEAM_NAME_ALIASES: &[&str] = &["team name", "team_name", "city name"];
const CURRENT_TEAM_ALIASES: &[&str] = &["current team", "player team", "team_id", "team"];

pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<Schema> {
    let content = fs::read_to_string(&path)?;
    let schema = parse_schema(&content)?;
    info!(
        "Loaded schema for {} from {}: {} fields in {} categories",
        schema.process_name,
        path.as_ref().display(),
        schema.fields().len(),
        schema.categories().len()
    );
    Ok(schema)
}

pub fn parse_schema(content: &str) -> Result<Schema> {
    let root: Value = serde_json::from_str(content)?;
    let root = root
        .as_object()
        .ok_or_else(|| Error::InvalidSchema("document root is not an object".to_string()))?;

    let mut schema = Schema::default();

    let game_info = root.get("game_info").and_then(Value::as_object);
    if let Some(info) = game_info {
        schema.process_name = string_value(info.get("executable"))
            .or_else(|| string_value(info.get("process")))
            .unwrap_or_default();
        schema.module_name = string_value(info.get("module"))
            .unwrap_or_else(|| schema.process_name.clone());
        schema.version = string_value(info.get("version")).unwrap_or_default();
    }
    if schema.process_name.is_empty() {
        warn!("Schema does not name a target executable; live access disabled");
    }

    schema.player = TableSpec {
        stride: stride_value(game_info, &["playerSize", "player_size"]),
        chains: Vec::new(),
        max_records: count_value(game_info, &["maxPlayers", "max_players"], DEFAULT_MAX_PLAYERS),
    };
    schema.team = TableSpec {
        stride: stride_value(game_info, &["teamSize", "team_size"]),
        chains: Vec::new(),
        max_records: count_value(game_info, &["maxTeams", "max_teams"], DEFAULT_MAX_TEAMS),
    };
    if schema.player.stride == 0 {
        warn!("Player stride missing; player table disabled");
    }
    if schema.team.stride == 0 {
        warn!("Team stride missing; team table disabled");
    }

    if let Some(pointers) = root.get("base_pointers").and_then(Value::as_object) {
        for (key, config) in pointers {
            let chains = parse_chain_config(config);
            if chains.is_empty() {
                warn!("Base pointer entry '{}' has no resolvable chains", key);
                continue;
            }
            match classify_table_key(key) {
                Some(TableSlot::Player) => schema.player.chains.extend(chains),
                Some(TableSlot::Team) => schema.team.chains.extend(chains),
                None => debug!("Ignoring base pointer entry '{}'", key),
            }
        }
    }
    if let Some(candidates) = root.get("pointer_candidates").and_then(Value::as_object) {
        for (key, list) in candidates {
            let chains = parse_candidate_list(list);
            match classify_table_key(key) {
                Some(TableSlot::Player) => schema.player.chains.extend(chains),
                Some(TableSlot::Team) => schema.team.chains.extend(chains),
                None => debug!("Ignoring pointer candidates for '{}'", key),
            }
        }
    }

    let mut skipped = 0usize;
    if let Some(entries) = root.get("offsets").and_then(Value::as_array) {
        for entry in entries {
            match parse_field_entry(entry) {
                Some(field) => schema.push_field(field),
                None => {
                    skipped += 1;
                    warn!("Skipping malformed offset entry: {}", entry);
                }
            }
        }
    }
    if skipped > 0 {
        warn!("Skipped {} malformed offset entries", skipped);
    }

    if schema.fields().is_empty() && schema.player.chains.is_empty() {
        return Err(Error::InvalidSchema(
            "document defines no offsets and no base pointers".to_string(),
        ));
    }

    schema.names = derive_name_layout(&schema, root.get("game_info").and_then(Value::as_object));
    Ok(schema)
}

enum TableSlot {
    Player,
    Team,
}

fn classify_table_key(key: &str) -> Option<TableSlot> {
    let key = key.to_lowercase();
    if key.contains("player") {
        Some(TableSlot::Player)
    } else if key.contains("team") {
        Some(TableSlot::Team)
    } else {
        None
    }
}

/// Parse a numeric literal: JSON number, decimal string or `0x` hex string.
fn parse_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let s = s.trim();
            let (negative, digits) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s),
            };
            let parsed = if let Some(hex) = digits
                .strip_prefix("0x")
                .or_else(|| digits.strip_prefix("0X"))
            {
                i64::from_str_radix(hex, 16).ok()
            } else {
                digits.parse::<i64>().ok()
            }?;
            Some(if negative { -parsed } else { parsed })
        }
        _ => None,
    }
}

fn number_field(entry: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| entry.get(*k).and_then(parse_number))
}

fn string_value(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn stride_value(info: Option<&serde_json::Map<String, Value>>, keys: &[&str]) -> u64 {
    info.and_then(|i| number_field(i, keys))
        .filter(|&v| v > 0)
        .map_or(0, |v| v as u64)
}

fn count_value(
    info: Option<&serde_json::Map<String, Value>>,
    keys: &[&str],
    default: usize,
) -> usize {
    info.and_then(|i| number_field(i, keys))
        .filter(|&v| v > 0)
        .map_or(default, |v| v as usize)
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    }
}

/// Parse a single hop. A bare number is shorthand for "advance and follow",
/// the form legacy bundles use for classic offset lists.
fn parse_hop(value: &Value) -> Hop {
    match value.as_object() {
        Some(step) => {
            let offset = number_field(step, &["offset", "add", "delta", "value", "rva"]).unwrap_or(0);
            let post_add = number_field(
                step,
                &["post", "postAdd", "post_add", "finalOffset", "final_offset"],
            )
            .unwrap_or(0);
            let mut dereference = ["dereference", "deref", "read", "pointer", "follow", "resolve"]
                .iter()
                .any(|k| truthy(step.get(*k)));
            if let Some(kind) = step.get("type").and_then(Value::as_str) {
                if matches!(kind.to_lowercase().as_str(), "read" | "pointer" | "deref") {
                    dereference = true;
                }
            }
            Hop {
                offset,
                dereference,
                post_add,
            }
        }
        None => Hop {
            offset: parse_number(value).unwrap_or(0),
            dereference: true,
            post_add: 0,
        },
    }
}

/// Parse one base pointer config into candidate chains.
///
/// A config whose steps are themselves full chain configs (each carrying its
/// own base address) is a chain-of-chains: it flattens into independent
/// candidates tried in declaration order, inheriting the outer defaults.
fn parse_chain_config(value: &Value) -> Vec<PointerChain> {
    let Some(config) = value.as_object() else {
        return Vec::new();
    };
    let Some(base) = number_field(config, &["address", "rva", "base"]) else {
        return Vec::new();
    };
    let base = base.max(0) as u64;
    let final_offset = number_field(config, &["finalOffset", "final_offset"]).unwrap_or(0);
    let absolute = truthy(config.get("absolute")) || truthy(config.get("isAbsolute"));
    let direct = ["direct_table", "direct", "directTable", "treat_as_base"]
        .iter()
        .any(|k| truthy(config.get(*k)));

    let steps = config.get("chain").or_else(|| config.get("steps"));
    if let Some(Value::Array(steps)) = steps {
        let nested: Vec<&serde_json::Map<String, Value>> = steps
            .iter()
            .filter_map(Value::as_object)
            .filter(|s| ["address", "rva", "base"].iter().any(|k| s.contains_key(*k)))
            .collect();
        if !steps.is_empty() && nested.len() == steps.len() {
            let mut chains = Vec::new();
            for candidate in nested {
                let mut merged = candidate.clone();
                if !merged.contains_key("finalOffset") && !merged.contains_key("final_offset") {
                    merged.insert("finalOffset".to_string(), Value::from(final_offset));
                }
                if !merged.contains_key("absolute") && !merged.contains_key("isAbsolute") {
                    merged.insert("absolute".to_string(), Value::from(absolute));
                }
                chains.extend(parse_chain_config(&Value::Object(merged)));
            }
            if !chains.is_empty() {
                return chains;
            }
        }
    }

    let hops = match steps {
        Some(Value::Array(steps)) => steps.iter().map(parse_hop).collect(),
        _ => Vec::new(),
    };
    vec![PointerChain {
        base,
        absolute,
        direct,
        hops,
        final_offset,
    }]
}

/// Parse an auxiliary candidate list: full configs or compact
/// `[rva, finalOffset, extraDeref?, direct?]` tuples.
fn parse_candidate_list(value: &Value) -> Vec<PointerChain> {
    let Some(list) = value.as_array() else {
        return Vec::new();
    };
    let mut chains = Vec::new();
    for candidate in list {
        match candidate {
            Value::Object(_) => chains.extend(parse_chain_config(candidate)),
            Value::Array(tuple) => {
                let Some(base) = tuple.first().and_then(parse_number).filter(|&v| v > 0) else {
                    continue;
                };
                let final_offset = tuple.get(1).and_then(parse_number).unwrap_or(0);
                let extra_deref = tuple.get(2).map(|v| truthy(Some(v))).unwrap_or(false);
                let direct = tuple.get(3).map(|v| truthy(Some(v))).unwrap_or(false);
                let hops = if extra_deref {
                    vec![Hop {
                        offset: 0,
                        dereference: true,
                        post_add: 0,
                    }]
                } else {
                    Vec::new()
                };
                chains.push(PointerChain {
                    base: base as u64,
                    absolute: false,
                    direct,
                    hops,
                    final_offset,
                });
            }
            _ => {}
        }
    }
    chains
}

fn parse_field_entry(value: &Value) -> Option<FieldDescriptor> {
    let entry = value.as_object()?;
    let name = string_value(entry.get("name"))?;
    let category = string_value(entry.get("category")).unwrap_or_else(|| "Misc".to_string());

    let offset = number_field(entry, &["address", "offset", "hex"]).filter(|&v| v >= 0)?;
    let start_bit = number_field(entry, &["startBit", "start_bit"])
        .filter(|&v| v >= 0)
        .unwrap_or(0) as u32;

    let type_tag = entry
        .get("type")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();

    let mut length = number_field(entry, &["length"]).unwrap_or(0);
    if length <= 0 {
        // Bundles often carry a byte `size` instead of a bit length.
        let size = number_field(entry, &["size"]).unwrap_or(0);
        length = match type_tag.as_str() {
            "bitfield" | "bool" | "boolean" | "combo" => size,
            "number" | "slider" | "int" | "uint" | "pointer" | "float" => size * 8,
            _ => 0,
        };
    }
    if length <= 0 {
        return None;
    }
    let length = length as u32;

    let kind = match type_tag.as_str() {
        "wstring" | "utf16" => FieldKind::Text {
            encoding: TextEncoding::Utf16,
        },
        "string" | "text" | "ascii" => FieldKind::Text {
            encoding: TextEncoding::Ascii,
        },
        _ => match entry.get("values").and_then(Value::as_array) {
            Some(values) => FieldKind::Enumerated {
                values: values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            },
            None => FieldKind::Number,
        },
    };

    let access = if truthy(entry.get("requiresDereference")) || truthy(entry.get("requires_deref"))
    {
        let deref = number_field(entry, &["dereferenceAddress", "deref_offset"])
            .filter(|&v| v >= 0)?;
        FieldAccess::Dereference {
            offset: deref as u64,
        }
    } else {
        FieldAccess::Direct
    };

    Some(FieldDescriptor {
        category,
        name,
        offset: offset as u64,
        start_bit,
        length,
        kind,
        access,
    })
}

fn text_field_of(field: &FieldDescriptor, stride: u64) -> Option<TextField> {
    let FieldKind::Text { encoding } = field.kind else {
        return None;
    };
    // Capacity must stay inside the record so name probes on a candidate
    // base never read past one stride.
    let mut max_chars = field.length as usize;
    if stride > 0 {
        max_chars = max_chars.min(stride.saturating_sub(field.offset) as usize);
    }
    if max_chars == 0 {
        return None;
    }
    Some(TextField {
        offset: field.offset,
        max_chars,
        encoding,
    })
}

fn derive_name_layout(
    schema: &Schema,
    game_info: Option<&serde_json::Map<String, Value>>,
) -> NameLayout {
    let first_name = schema
        .find_field_aliased("Vitals", FIRST_NAME_ALIASES)
        .and_then(|f| text_field_of(f, schema.player.stride));
    let last_name = schema
        .find_field_aliased("Vitals", LAST_NAME_ALIASES)
        .and_then(|f| text_field_of(f, schema.player.stride));
    let team_name = schema
        .find_field_aliased("Teams", TEAM_NAME_ALIASES)
        .and_then(|f| text_field_of(f, schema.team.stride));
    let team_ptr_offset = schema
        .find_field_aliased("Vitals", CURRENT_TEAM_ALIASES)
        .and_then(|f| match f.access {
            FieldAccess::Dereference { offset } => Some(offset),
            FieldAccess::Direct => None,
        });

    if first_name.is_none() && last_name.is_none() {
        warn!("No player name fields in schema; scans and base probes limited");
    }
    if team_name.is_none() {
        warn!("No team name field in schema; team discovery disabled");
    }

    NameLayout {
        first_name,
        last_name,
        team_name,
        team_ptr_offset,
        roster_slots: count_value(game_info, &["teamSlots", "rosterSlots"], DEFAULT_ROSTER_SLOTS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "game_info": {
            "executable": "NBA2K26.exe",
            "version": "2K26",
            "playerSize": "0x1000",
            "teamSize": 4096,
            "teamSlots": 2
        },
        "base_pointers": {
            "Player": {
                "address": "0x5F2A8E0",
                "chain": [
                    { "offset": "0x10", "dereference": true },
                    { "offset": 8, "dereference": true, "post": "0x20" }
                ],
                "finalOffset": "0x28"
            },
            "Team": {
                "chain": [
                    { "address": "0x7000", "finalOffset": 16 },
                    { "address": "0x8000", "absolute": true, "direct": true }
                ],
                "address": "0x7000"
            }
        },
        "pointer_candidates": {
            "Player": [["0x6000", 0, true]]
        },
        "offsets": [
            { "category": "Vitals", "name": "First Name", "address": "0x48", "length": 20, "type": "wstring" },
            { "category": "Vitals", "name": "Last Name", "address": 136, "length": 20, "type": "wstring" },
            { "category": "Vitals", "name": "Current Team", "address": "0x0", "length": 32, "type": "number",
              "requiresDereference": true, "dereferenceAddress": "0x660" },
            { "category": "Attributes", "name": "Three Point", "address": "0x1A2", "startBit": 2, "length": 7 },
            { "category": "Attributes", "name": "Broken" },
            { "category": "Teams", "name": "Team Name", "address": "0x10", "length": 24, "type": "wstring" },
            { "category": "Badges", "name": "Posterizer", "address": 520, "startBit": 3, "length": 3,
              "values": ["None", "Bronze", "Silver", "Gold", "Hall of Fame"] }
        ]
    }"#;

    #[test]
    fn test_parse_number_decimal_and_hex_agree() {
        assert_eq!(parse_number(&Value::from(418)), Some(418));
        assert_eq!(parse_number(&Value::from("418")), Some(418));
        assert_eq!(parse_number(&Value::from("0x1A2")), Some(418));
        assert_eq!(parse_number(&Value::from("0X1A2")), Some(418));
        assert_eq!(parse_number(&Value::from("-0x10")), Some(-16));
        assert_eq!(parse_number(&Value::from("junk")), None);
    }

    #[test]
    fn test_fixture_parses_with_skips() {
        let schema = parse_schema(FIXTURE).unwrap();
        assert_eq!(schema.process_name, "NBA2K26.exe");
        assert_eq!(schema.player.stride, 0x1000);
        assert_eq!(schema.team.stride, 4096);
        // "Broken" has no address/length and must be skipped, not fatal.
        assert_eq!(schema.fields().len(), 6);
        let categories: Vec<&str> = schema.categories().iter().map(String::as_str).collect();
        assert_eq!(categories, vec!["Vitals", "Attributes", "Teams", "Badges"]);
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let schema = parse_schema(FIXTURE).unwrap();
        let field = schema.field("attributes", "THREE POINT").unwrap();
        assert_eq!(field.offset, 0x1A2);
        assert_eq!(field.start_bit, 2);
        assert_eq!(field.length, 7);
        assert!(schema.field("attributes", "four point").is_none());
    }

    #[test]
    fn test_enumerated_and_deref_tags() {
        let schema = parse_schema(FIXTURE).unwrap();
        let badge = schema.field("Badges", "Posterizer").unwrap();
        assert!(matches!(&badge.kind, FieldKind::Enumerated { values } if values.len() == 5));
        let team = schema.field("Vitals", "Current Team").unwrap();
        assert_eq!(team.access, FieldAccess::Dereference { offset: 0x660 });
    }

    #[test]
    fn test_player_chain_and_candidates() {
        let schema = parse_schema(FIXTURE).unwrap();
        // Declared chain first, pointer_candidates appended after.
        assert_eq!(schema.player.chains.len(), 2);
        let chain = &schema.player.chains[0];
        assert_eq!(chain.base, 0x5F2A8E0);
        assert!(!chain.absolute);
        assert_eq!(chain.final_offset, 0x28);
        assert_eq!(
            chain.hops,
            vec![
                Hop { offset: 0x10, dereference: true, post_add: 0 },
                Hop { offset: 8, dereference: true, post_add: 0x20 },
            ]
        );
        let extra = &schema.player.chains[1];
        assert_eq!(extra.base, 0x6000);
        assert_eq!(extra.hops.len(), 1);
        assert!(extra.hops[0].dereference);
    }

    #[test]
    fn test_chain_of_chains_flattens_in_order() {
        let schema = parse_schema(FIXTURE).unwrap();
        assert_eq!(schema.team.chains.len(), 2);
        assert_eq!(schema.team.chains[0].base, 0x7000);
        assert_eq!(schema.team.chains[0].final_offset, 16);
        assert!(!schema.team.chains[0].absolute);
        assert_eq!(schema.team.chains[1].base, 0x8000);
        assert!(schema.team.chains[1].absolute);
        assert!(schema.team.chains[1].direct);
    }

    #[test]
    fn test_name_layout_derived() {
        let schema = parse_schema(FIXTURE).unwrap();
        let first = schema.names.first_name.unwrap();
        assert_eq!(first.offset, 0x48);
        assert_eq!(first.max_chars, 20);
        assert_eq!(schema.names.team_ptr_offset, Some(0x660));
        assert_eq!(schema.names.roster_slots, 2);
        let team_name = schema.names.team_name.unwrap();
        assert_eq!(team_name.offset, 0x10);
    }

    #[test]
    fn test_empty_document_is_invalid() {
        assert!(parse_schema("{}").is_err());
        assert!(parse_schema("[]").is_err());
    }

    #[test]
    fn test_load_schema_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        let schema = load_schema(file.path()).unwrap();
        assert_eq!(schema.process_name, "NBA2K26.exe");
    }
}

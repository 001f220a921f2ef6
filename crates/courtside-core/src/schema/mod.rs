//! Offset schema: declarative description of where roster data lives inside
//! the target process.
//!
//! A schema is loaded once, immutable afterwards, and passed by reference
//! into the resolver and scanner. Multiple schemas (test fixtures, per-patch
//! bundles) can coexist in one process.

mod chain;
mod field;
mod loader;

use std::collections::HashMap;

pub use chain::{Hop, PointerChain};
pub use field::{FieldAccess, FieldDescriptor, FieldKind, TextEncoding};
pub use loader::{load_schema, parse_schema};

/// Index-addressed table kinds known to the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum TableKind {
    Player,
    Team,
}

/// Layout of one fixed-stride table.
#[derive(Debug, Clone, Default)]
pub struct TableSpec {
    /// Byte size of one record; 0 disables index addressing for the table.
    pub stride: u64,
    /// Candidate pointer chains, in declaration order.
    pub chains: Vec<PointerChain>,
    /// Upper bound for sequential scans.
    pub max_records: usize,
}

impl TableSpec {
    /// Whether records can be addressed by index at all.
    pub fn is_addressable(&self) -> bool {
        self.stride > 0 && !self.chains.is_empty()
    }
}

/// A fixed-width string slot inside a record.
#[derive(Debug, Clone, Copy)]
pub struct TextField {
    pub offset: u64,
    pub max_chars: usize,
    pub encoding: TextEncoding,
}

/// Where the identity strings used by scans and plausibility probes live.
#[derive(Debug, Clone, Default)]
pub struct NameLayout {
    pub first_name: Option<TextField>,
    pub last_name: Option<TextField>,
    pub team_name: Option<TextField>,
    /// Offset of the per-player pointer to its team record.
    pub team_ptr_offset: Option<u64>,
    /// Number of 8-byte roster slot pointers at the head of a team record.
    pub roster_slots: usize,
}

/// Parsed offset bundle: process identity, table layouts and field index.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub process_name: String,
    pub module_name: String,
    pub version: String,
    pub player: TableSpec,
    pub team: TableSpec,
    pub names: NameLayout,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) categories: Vec<String>,
    pub(crate) by_category: HashMap<String, Vec<usize>>,
    pub(crate) index: HashMap<(String, String), usize>,
}

impl Schema {
    pub fn table(&self, kind: TableKind) -> &TableSpec {
        match kind {
            TableKind::Player => &self.player,
            TableKind::Team => &self.team,
        }
    }

    /// All field descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Category names in declaration order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Case-insensitive `(category, name)` lookup.
    pub fn field(&self, category: &str, name: &str) -> Option<&FieldDescriptor> {
        let key = (
            category.trim().to_lowercase(),
            name.trim().to_lowercase(),
        );
        self.index.get(&key).map(|&i| &self.fields[i])
    }

    /// Fields of one category, in declaration order.
    pub fn category_fields(&self, category: &str) -> Vec<&FieldDescriptor> {
        self.by_category
            .get(&category.trim().to_lowercase())
            .map(|indices| indices.iter().map(|&i| &self.fields[i]).collect())
            .unwrap_or_default()
    }

    /// Find a field by name under any of the given aliases, preferring the
    /// given category but falling back to a global name match. Used to wire
    /// up the well-known identity fields whose labels vary across bundles.
    pub(crate) fn find_field_aliased(
        &self,
        category: &str,
        aliases: &[&str],
    ) -> Option<&FieldDescriptor> {
        let category = category.trim().to_lowercase();
        for alias in aliases {
            let key = (category.clone(), alias.to_lowercase());
            if let Some(&i) = self.index.get(&key) {
                return Some(&self.fields[i]);
            }
        }
        for alias in aliases {
            let alias = alias.to_lowercase();
            if let Some(field) = self
                .fields
                .iter()
                .find(|f| f.name.to_lowercase() == alias)
            {
                return Some(field);
            }
        }
        None
    }

    pub(crate) fn push_field(&mut self, field: FieldDescriptor) {
        let key = (
            field.category.trim().to_lowercase(),
            field.name.trim().to_lowercase(),
        );
        // First declaration wins, matching the dedupe rule of the bundles.
        if self.index.contains_key(&key) {
            return;
        }
        let idx = self.fields.len();
        if !self.by_category.contains_key(&key.0) {
            self.categories.push(field.category.trim().to_string());
        }
        self.by_category.entry(key.0.clone()).or_default().push(idx);
        self.index.insert(key, idx);
        self.fields.push(field);
    }
}

//! CLI command implementations.

pub mod fields;
pub mod get;
pub mod scan;
pub mod set;
pub mod status;

use anyhow::{Context, Result, bail};
use courtside_core::{FieldDescriptor, GameProcess, Roster, Schema};
use std::sync::Arc;

/// Build a live roster model over the schema's target process.
pub fn open_roster(schema: Arc<Schema>) -> Result<Roster<GameProcess>> {
    if schema.process_name.is_empty() {
        bail!("schema does not name a target executable");
    }
    let process = GameProcess::new(schema.process_name.clone(), schema.module_name.clone());
    Ok(Roster::new(schema, process))
}

/// Look up a field or fail with the categories that do exist.
pub fn require_field<'a>(
    schema: &'a Schema,
    category: &str,
    name: &str,
) -> Result<&'a FieldDescriptor> {
    schema.field(category, name).with_context(|| {
        format!(
            "no field '{}' in category '{}' (categories: {})",
            name,
            category,
            schema.categories().join(", ")
        )
    })
}

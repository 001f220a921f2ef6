//! Status command: attach and report how the roster was discovered.

use anyhow::Result;
use courtside_core::Schema;
use std::sync::Arc;

use super::open_roster;

pub fn run(schema: Arc<Schema>) -> Result<()> {
    println!("Target process: {}", schema.process_name);
    println!(
        "Schema: version '{}', {} fields in {} categories",
        schema.version,
        schema.fields().len(),
        schema.categories().len()
    );
    println!(
        "Tables: player stride {:#x} ({} chains), team stride {:#x} ({} chains)",
        schema.player.stride,
        schema.player.chains.len(),
        schema.team.stride,
        schema.team.chains.len()
    );

    let mut roster = open_roster(schema)?;
    let source = roster.refresh();
    println!(
        "Roster source: {} ({} players, {} teams)",
        source,
        roster.players().len(),
        roster.teams().len()
    );
    Ok(())
}

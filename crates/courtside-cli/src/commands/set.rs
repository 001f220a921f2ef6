//! Set command: write one field of one player.

use anyhow::{Result, bail};
use courtside_core::{Schema, convert};
use std::sync::Arc;
use tracing::info;

use super::{open_roster, require_field};
use crate::cli::Scale;

pub fn run(
    schema: Arc<Schema>,
    player: usize,
    category: &str,
    name: &str,
    value: f64,
    scale: Option<Scale>,
) -> Result<()> {
    let field = require_field(&schema, category, name)?.clone();

    let raw = match scale {
        Some(Scale::Rating) => convert::rating_to_raw(value, field.length),
        Some(Scale::Tendency) => convert::tendency_to_raw(value, field.length),
        None => {
            if value < 0.0 || value.fract() != 0.0 {
                bail!("raw values must be non-negative integers (got {})", value);
            }
            value as u64
        }
    };

    let mut roster = open_roster(schema)?;
    if !roster.set_player_field(player, &field, raw) {
        bail!("write failed for field '{}' on player {}", field.name, player);
    }

    let readback = roster.player_field(player, &field);
    info!("Wrote {} (raw {}) -> readback {:?}", field.name, raw, readback);
    match readback {
        Some(now) => println!("{} = {}", field.name, now),
        None => println!("{} written (readback unavailable)", field.name),
    }
    Ok(())
}

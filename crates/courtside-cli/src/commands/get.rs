//! Get command: read one field of one player.

use anyhow::{Result, bail};
use courtside_core::{FieldKind, Schema, convert};
use std::sync::Arc;

use super::{open_roster, require_field};
use crate::cli::Scale;

pub fn run(
    schema: Arc<Schema>,
    player: usize,
    category: &str,
    name: &str,
    scale: Option<Scale>,
) -> Result<()> {
    let field = require_field(&schema, category, name)?.clone();
    let mut roster = open_roster(schema)?;

    let Some(raw) = roster.player_field(player, &field) else {
        bail!("field '{}' unreadable for player {}", field.name, player);
    };

    match scale {
        Some(Scale::Rating) => {
            println!("{} (rating {})", raw, convert::raw_to_rating(raw, field.length));
        }
        Some(Scale::Tendency) => {
            println!("{} (tendency {})", raw, convert::raw_to_tendency(raw, field.length));
        }
        None => match &field.kind {
            FieldKind::Enumerated { values } => {
                let label = values
                    .get(raw as usize)
                    .map(String::as_str)
                    .unwrap_or("<out of range>");
                println!("{} ({})", raw, label);
            }
            _ => println!("{}", raw),
        },
    }
    Ok(())
}

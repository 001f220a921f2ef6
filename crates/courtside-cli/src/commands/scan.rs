//! Scan command: refresh and list the live roster.

use anyhow::Result;
use courtside_core::{RosterSource, Schema};
use std::sync::Arc;

use super::open_roster;

pub fn run(schema: Arc<Schema>, team: Option<String>) -> Result<()> {
    let mut roster = open_roster(schema)?;
    let source = roster.refresh();
    if source == RosterSource::Empty {
        println!("No roster available (process not running or bases unresolved).");
        return Ok(());
    }

    match team {
        Some(team) => {
            let players: Vec<_> = roster
                .players()
                .iter()
                .filter(|p| p.team_name.eq_ignore_ascii_case(&team))
                .collect();
            println!("{} ({} players, via {})", team, players.len(), source);
            for player in players {
                println!("  [{:>5}] {}", player.index, player.full_name());
            }
        }
        None => {
            println!(
                "{} teams, {} players (via {})",
                roster.teams().len(),
                roster.players().len(),
                source
            );
            for team in roster.teams() {
                let count = roster
                    .players()
                    .iter()
                    .filter(|p| p.team_name == team.name)
                    .count();
                match team.index {
                    Some(index) => println!("  [{:>3}] {:<24} {} players", index, team.name, count),
                    None => println!("  [  -] {:<24} {} players", team.name, count),
                }
            }
        }
    }
    Ok(())
}

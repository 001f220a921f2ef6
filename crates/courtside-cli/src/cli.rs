//! Command line definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "courtside")]
#[command(about = "Live roster inspector and editor")]
pub struct Cli {
    /// Offset schema bundle describing the target build
    #[arg(short, long, default_value = "offsets.json")]
    pub schema: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the schema's categories and field definitions
    Fields {
        /// Restrict the listing to one category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Attach to the game and report how the roster was discovered
    Status,
    /// Refresh the roster and list teams and players
    Scan {
        /// Only list players on this team
        #[arg(short, long)]
        team: Option<String>,
    },
    /// Read one field of one player
    Get {
        /// Player table index
        #[arg(short, long)]
        player: usize,
        /// Field category, e.g. "Attributes"
        #[arg(short, long)]
        category: String,
        /// Field name, e.g. "Three Point"
        #[arg(short, long)]
        name: String,
        /// Also show the value on a display scale
        #[arg(long, value_enum)]
        scale: Option<Scale>,
    },
    /// Write one field of one player
    Set {
        /// Player table index
        #[arg(short, long)]
        player: usize,
        /// Field category, e.g. "Attributes"
        #[arg(short, long)]
        category: String,
        /// Field name, e.g. "Three Point"
        #[arg(short, long)]
        name: String,
        /// Value to write; raw unless --scale converts it first
        #[arg(short, long)]
        value: f64,
        /// Interpret the value on a display scale
        #[arg(long, value_enum)]
        scale: Option<Scale>,
    },
}

/// Display scale used by `get`/`set` conversions.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Scale {
    /// 25-99 attribute scale
    Rating,
    /// 0-100 tendency scale
    Tendency,
}

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("courtside=info".parse()?),
        )
        .init();

    let args = Cli::parse();

    let schema = Arc::new(courtside_core::load_schema(&args.schema)?);
    info!(
        "Schema loaded from {:?} ({} fields)",
        args.schema,
        schema.fields().len()
    );

    match args.command {
        Command::Fields { category } => commands::fields::run(&schema, category),
        Command::Status => commands::status::run(schema),
        Command::Scan { team } => commands::scan::run(schema, team),
        Command::Get {
            player,
            category,
            name,
            scale,
        } => commands::get::run(schema, player, &category, &name, scale),
        Command::Set {
            player,
            category,
            name,
            value,
            scale,
        } => commands::set::run(schema, player, &category, &name, value, scale),
    }
}

//! PLSS CLI: parse Township/Range/Section land descriptions.
//!
//! Turns free-text descriptions into one structured record per tract,
//! optionally decomposed into lots and quarter-quarters.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}

//! lodkit CLI entry point

use anyhow::Result;
use clap::Parser;

use lodkit_cli::{execute, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    execute(cli)
}

//! # EDeA Repository CLI
//!
//! This is the binary entry point for the `edea-repo` command-line tool, an
//! operator's view on the repository cache used by the EDeA service.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Loading the service configuration and constructing the cache.
//! - Executing the selected command and reporting errors.
//!
//! The core logic lives in the `edea_repo` library crate; the binary is a thin
//! wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}

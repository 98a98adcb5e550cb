//! # Show Command Implementation
//!
//! Writes the content of a single file at a revision to stdout. Names are
//! paths from the repository root and match case-insensitively unless
//! `--case-sensitive` is given.

use std::io::{self, Write};

use anyhow::{Context as _, Result};
use clap::Args;

use edea_repo::module::{ModuleRef, DEFAULT_REVISION};

use super::Context;

/// Print a file at a revision
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Repository URL
    pub url: String,

    /// File path from the repository root
    pub file: String,

    /// Revision: branch, tag, commit or relative ref like HEAD~2
    #[arg(long, value_name = "REV", default_value = DEFAULT_REVISION)]
    pub rev: String,

    /// Match the file name exactly
    #[arg(long)]
    pub case_sensitive: bool,
}

/// Execute the `show` command.
pub fn execute(ctx: &Context, args: ShowArgs) -> Result<()> {
    let module = ModuleRef::new(&args.url, "");
    let cache = ctx.cache_with(&module)?;

    let content = cache
        .with_content(&args.url, |content| {
            content.file_at(&args.file, args.case_sensitive, &args.rev)
        })
        .map_err(|e| ctx.explain(e))?;

    io::stdout()
        .write_all(&content)
        .context("Could not write to stdout")?;
    Ok(())
}

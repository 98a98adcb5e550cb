//! # Path Command Implementation
//!
//! Prints the absolute directory of a (sub-)module inside the cache, as
//! resolved through the repository's `edea.yml`.

use anyhow::Result;
use clap::Args;

use super::{Context, ModuleArgs};

/// Print the directory of a (sub-)module
#[derive(Args, Debug)]
pub struct PathArgs {
    #[command(flatten)]
    pub module: ModuleArgs,
}

/// Execute the `path` command.
pub fn execute(ctx: &Context, args: PathArgs) -> Result<()> {
    let module = args.module.module();
    let cache = ctx.cache_with(&module)?;
    let dir = module
        .path(&cache, &args.module.rev)
        .map_err(|e| ctx.explain(e))?;
    println!("{}", dir.display());
    Ok(())
}

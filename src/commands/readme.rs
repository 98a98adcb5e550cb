//! # Readme Command Implementation

use anyhow::Result;
use clap::Args;

use super::{Context, ModuleArgs};

/// Print the readme of a (sub-)module
#[derive(Args, Debug)]
pub struct ReadmeArgs {
    #[command(flatten)]
    pub module: ModuleArgs,
}

/// Execute the `readme` command.
pub fn execute(ctx: &Context, args: ReadmeArgs) -> Result<()> {
    let module = args.module.module();
    let cache = ctx.cache_with(&module)?;
    let readme = module
        .readme(&cache, &args.module.rev)
        .map_err(|e| ctx.explain(e))?;
    print!("{}", readme);
    if !readme.ends_with('\n') {
        println!();
    }
    Ok(())
}

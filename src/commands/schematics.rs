//! # Schematics Command Implementation
//!
//! Plots every schematic sheet of a (sub-)module at a revision and writes
//! the SVGs into `--out`.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;

use super::{spinner, Context, ModuleArgs};

/// Export the schematics of a (sub-)module as SVG
#[derive(Args, Debug)]
pub struct SchematicsArgs {
    #[command(flatten)]
    pub module: ModuleArgs,

    /// Directory the SVG files are written to
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,
}

/// Execute the `schematics` command.
pub fn execute(ctx: &Context, args: SchematicsArgs) -> Result<()> {
    let module = args.module.module();
    let cache = ctx.cache_with(&module)?;

    let spinner = spinner("Plotting schematics".to_string());
    let svgs = module.export_schematics(&cache, &ctx.pipeline(), &args.module.rev);
    spinner.finish_and_clear();
    let svgs = svgs.map_err(|e| ctx.explain(e))?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("Could not create {}", args.out.display()))?;
    for (name, svg) in &svgs {
        let target = args.out.join(name);
        fs::write(&target, svg).with_context(|| format!("Could not write {}", target.display()))?;
        println!("{} {}", ctx.painter.ok(), target.display());
    }
    Ok(())
}

//! # Docs Command Implementation
//!
//! Builds the mdbook documentation of a (sub-)module at a revision. The
//! output goes to `--dest`, or below the configured book root at
//! `<host>/<owner>/<repo>[/<sub>]`.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use log::debug;

use super::{spinner, Context, ModuleArgs};

/// Build the mdbook documentation of a (sub-)module
#[derive(Args, Debug)]
pub struct DocsArgs {
    #[command(flatten)]
    pub module: ModuleArgs,

    /// Output directory for the rendered book
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,
}

/// Execute the `docs` command.
pub fn execute(ctx: &Context, args: DocsArgs) -> Result<()> {
    let module = args.module.module();
    let rev = &args.module.rev;
    let cache = ctx.cache_with(&module)?;

    if !module.has_docs(&cache, rev).map_err(|e| ctx.explain(e))? {
        bail!("{} has no book.toml at {}", args.module.url, rev);
    }

    let dest = match args.dest {
        Some(dest) => dest,
        None => module
            .book_dest(&ctx.config.book_root())
            .map_err(|e| ctx.explain(e))?,
    };

    let spinner = spinner("Building book".to_string());
    let book = module.build_docs(&cache, &ctx.pipeline(), rev, &dest);
    spinner.finish_and_clear();
    let book = book.map_err(|e| ctx.explain(e))?;

    debug!("build book log output: {}", book.log);
    println!("{} Book written to {}", ctx.painter.ok(), book.dest.display());
    Ok(())
}

//! # History Command Implementation
//!
//! Lists the commits touching a (sub-)module, newest first. Commits before
//! 2019 are not reported.

use anyhow::{Context as _, Result};
use clap::Args;

use edea_repo::module::ModuleRef;

use super::Context;

/// Print the commit history of a (sub-)module
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Repository URL
    pub url: String,

    /// Sub-module name from edea.yml (default: the whole repository)
    #[arg(long, value_name = "NAME", default_value = "")]
    pub sub: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Execute the `history` command.
pub fn execute(ctx: &Context, args: HistoryArgs) -> Result<()> {
    let module = ModuleRef::new(&args.url, &args.sub);
    let cache = ctx.cache_with(&module)?;
    let commits = module.history(&cache).map_err(|e| ctx.explain(e))?;

    if args.json {
        let json = serde_json::to_string_pretty(&commits).context("Could not render JSON")?;
        println!("{}", json);
        return Ok(());
    }

    for commit in &commits {
        let short = commit.hash.get(..10).unwrap_or(&commit.hash);
        println!(
            "{} {} {}",
            ctx.painter.strong(short),
            ctx.painter.dim(commit.time.format("%Y-%m-%d")),
            commit.summary()
        );
    }
    Ok(())
}

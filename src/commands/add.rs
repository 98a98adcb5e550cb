//! # Add Command Implementation
//!
//! Mirrors a repository into the cache. Adding a URL that is already cached
//! is a no-op unless `--strict` is given.

use anyhow::Result;
use clap::Args;

use edea_repo::cache::AddOutcome;

use super::{spinner, Context};

/// Add a repository to the cache
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Repository URL (https, ssh or scp-like)
    pub url: String,

    /// Fail if the repository is already cached
    #[arg(long)]
    pub strict: bool,
}

/// Execute the `add` command.
pub fn execute(ctx: &Context, args: AddArgs) -> Result<()> {
    let cache = ctx.cache()?;
    let painter = &ctx.painter;

    let spinner = spinner(format!("Cloning {}", args.url));
    let outcome = if args.strict {
        cache.register(&args.url)
    } else {
        cache.add(&args.url)
    };
    spinner.finish_and_clear();

    let outcome = outcome.map_err(|e| ctx.explain(e))?;
    let location = cache.location(&args.url).map_err(|e| ctx.explain(e))?;

    match outcome {
        AddOutcome::Cloned => println!("{} Cloned {}", painter.ok(), args.url),
        AddOutcome::Empty => println!(
            "{} Added {} {}",
            painter.ok(),
            args.url,
            painter.dim("(empty repository)")
        ),
        AddOutcome::AlreadyCached => {
            println!("{} {} is already cached", painter.skip(), args.url)
        }
    }
    println!("{}", painter.strong(location.display()));

    Ok(())
}

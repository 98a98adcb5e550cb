//! # Update Command Implementation
//!
//! Fetches (default) or pulls one cached repository, or all of them in
//! parallel with `--all`. With `--all` a failing repository does not stop
//! the others; the command fails at the end if any of them failed.

use anyhow::{bail, Result};
use clap::Args;

use edea_repo::cache::UpdateMode;
use edea_repo::repository::FetchOutcome;

use super::{spinner, Context};

/// Fetch or pull cached repositories
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Repository URL to update
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub url: Option<String>,

    /// Update every cached repository
    #[arg(long)]
    pub all: bool,

    /// Fast-forward the working tree instead of only fetching
    #[arg(long)]
    pub pull: bool,
}

/// Execute the `update` command.
pub fn execute(ctx: &Context, args: UpdateArgs) -> Result<()> {
    let cache = ctx.cache()?;
    let painter = &ctx.painter;
    let mode = if args.pull {
        UpdateMode::Pull
    } else {
        UpdateMode::Fetch
    };

    let describe = |outcome: FetchOutcome| match outcome {
        FetchOutcome::Updated => format!("{} updated", painter.ok()),
        FetchOutcome::AlreadyUpToDate => format!("{} already up to date", painter.skip()),
    };

    if let Some(url) = args.url {
        let outcome = match mode {
            UpdateMode::Fetch => cache.fetch(&url),
            UpdateMode::Pull => cache.pull(&url),
        }
        .map_err(|e| ctx.explain(e))?;
        println!("{} {}", describe(outcome), url);
        return Ok(());
    }

    let spinner = spinner("Updating all repositories".to_string());
    let reports = cache.update_all(mode);
    spinner.finish_and_clear();
    let reports = reports.map_err(|e| ctx.explain(e))?;

    let mut failed = 0;
    for report in &reports {
        match &report.result {
            Ok(outcome) => println!("{} {}", describe(*outcome), report.url),
            Err(e) => {
                failed += 1;
                println!(
                    "{} {}: {}",
                    painter.fail(),
                    report.url,
                    painter.error(e.user_message(ctx.config.dev))
                );
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} repositories could not be updated", failed, reports.len());
    }
    Ok(())
}

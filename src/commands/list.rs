//! # List Command Implementation
//!
//! Displays the rows of the repository index, as a table or as JSON.

use anyhow::{Context as _, Result};
use clap::Args;

use edea_repo::index::CachedRepository;

use super::Context;

/// List cached repositories
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Also report the disk usage of each repository
    #[arg(long)]
    pub size: bool,
}

/// Execute the `list` command.
pub fn execute(ctx: &Context, args: ListArgs) -> Result<()> {
    let cache = ctx.cache()?;
    let records = cache.list().map_err(|e| ctx.explain(e))?;

    if args.json {
        let json = serde_json::to_string_pretty(&records).context("Could not render JSON")?;
        println!("{}", json);
        return Ok(());
    }

    if records.is_empty() {
        println!(
            "No cached repositories found in: {}",
            cache.root().display()
        );
        return Ok(());
    }

    let url_width = records.iter().map(|r| r.url.len()).max().unwrap_or(0);
    for record in &records {
        let size = if args.size {
            match cache.size(&record.url) {
                Ok(bytes) => format!("  {:>10}", format_size(bytes)),
                Err(e) => format!("  {:>10}", ctx.painter.error(e)),
            }
        } else {
            String::new()
        };
        println!(
            "{:<width$}  {}  {}{}",
            record.url,
            record.vcs,
            ctx.painter.dim(updated(record)),
            size,
            width = url_width
        );
    }
    println!("\nTotal: {} repositories", records.len());

    Ok(())
}

fn updated(record: &CachedRepository) -> String {
    record.updated_at.format("%Y-%m-%d %H:%M").to_string()
}

/// Format size in human-readable format
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

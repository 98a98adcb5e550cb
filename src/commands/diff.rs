//! # Diff Command Implementation
//!
//! Plots the PCB and the schematics of a (sub-)module at two revisions so
//! they can be compared side by side.
//!
//! With `--out` the results are written as files:
//!
//! ```text
//! <out>/a/pcb.json
//! <out>/a/<sheet>.svg
//! <out>/b/pcb.json
//! <out>/b/<sheet>.svg
//! ```
//!
//! Without it a JSON document with all plots is printed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use serde_json::Value;

use edea_repo::module::ModuleRef;

use super::{spinner, Context};

/// Plot a (sub-)module at two revisions
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Repository URL
    pub url: String,

    /// First revision
    #[arg(long, value_name = "REV")]
    pub a: String,

    /// Second revision
    #[arg(long, value_name = "REV")]
    pub b: String,

    /// Sub-module name from edea.yml (default: the whole repository)
    #[arg(long, value_name = "NAME", default_value = "")]
    pub sub: String,

    /// Directory the plots are written to
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

/// Execute the `diff` command.
pub fn execute(ctx: &Context, args: DiffArgs) -> Result<()> {
    let module = ModuleRef::new(&args.url, &args.sub);
    let cache = ctx.cache_with(&module)?;

    let spinner = spinner(format!("Plotting {} and {}", args.a, args.b));
    let plots = module.plot_diff(&cache, &ctx.pipeline(), &args.a, &args.b);
    spinner.finish_and_clear();
    let plots = plots.map_err(|e| ctx.explain(e))?;

    let Some(out) = args.out else {
        let json = serde_json::to_string_pretty(&plots).context("Could not render JSON")?;
        println!("{}", json);
        return Ok(());
    };

    write_side(&out.join("a"), &plots.pcb_a, &plots.sch_a)?;
    write_side(&out.join("b"), &plots.pcb_b, &plots.sch_b)?;
    println!("{} Plots written to {}", ctx.painter.ok(), out.display());
    Ok(())
}

fn write_side(dir: &Path, pcb: &Value, schematics: &BTreeMap<String, String>) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Could not create {}", dir.display()))?;
    fs::write(dir.join("pcb.json"), serde_json::to_vec_pretty(pcb)?)
        .with_context(|| format!("Could not write {}", dir.join("pcb.json").display()))?;
    for (name, svg) in schematics {
        fs::write(dir.join(name), svg)
            .with_context(|| format!("Could not write {}", dir.join(name).display()))?;
    }
    Ok(())
}

//! # CLI Command Implementations
//!
//! Each subcommand of `edea-repo` lives in its own file with:
//! - an `Args` struct derived with `clap`,
//! - an `execute` function taking the shared [`Context`] and the parsed args.
//!
//! Commands that work on a module make sure its repository is cached first,
//! the same way the service does when a module page is requested.

pub mod add;
pub mod completions;
pub mod diff;
pub mod docs;
pub mod history;
pub mod list;
pub mod path;
pub mod readme;
pub mod schematics;
pub mod show;
pub mod update;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context as _, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use edea_repo::artifacts::Pipeline;
use edea_repo::cache::RepoCache;
use edea_repo::config::Config;
use edea_repo::error::Error;
use edea_repo::module::{ModuleRef, DEFAULT_REVISION};
use edea_repo::output::{ColorChoice, Painter};

/// Repository URL plus sub-module and revision selection.
#[derive(Args, Debug, Clone)]
pub struct ModuleArgs {
    /// Repository URL
    pub url: String,

    /// Sub-module name from edea.yml (default: the whole repository)
    #[arg(long, value_name = "NAME", default_value = "")]
    pub sub: String,

    /// Revision: branch, tag, commit or relative ref like HEAD~2
    #[arg(long, value_name = "REV", default_value = DEFAULT_REVISION)]
    pub rev: String,
}

impl ModuleArgs {
    pub fn module(&self) -> ModuleRef {
        ModuleRef::new(&self.url, &self.sub)
    }
}

/// State shared by all commands.
pub struct Context {
    pub config: Config,
    pub painter: Painter,
}

impl Context {
    /// Load the configuration. `cache_root` overrides the configured root.
    pub fn load(config: Option<&Path>, cache_root: Option<PathBuf>, color: ColorChoice) -> Result<Self> {
        let mut config = Config::load(config).context("Could not load configuration")?;
        if let Some(root) = cache_root {
            config.cache.repo.base = Some(root);
        }
        Ok(Self {
            config,
            painter: Painter::new(color),
        })
    }

    pub fn cache(&self) -> Result<RepoCache> {
        let root = self.config.repo_cache_root();
        RepoCache::open(&root, self.config.cache_options())
            .with_context(|| format!("Could not open repository cache at {}", root.display()))
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.config.tools.clone())
    }

    /// Cache with the module's repository mirrored.
    pub fn cache_with(&self, module: &ModuleRef) -> Result<RepoCache> {
        let cache = self.cache()?;
        if !cache.has(&module.repo_url).map_err(|e| self.explain(e))? {
            let spinner = spinner(format!("Cloning {}", module.repo_url));
            let added = module.ensure(&cache);
            spinner.finish_and_clear();
            added.map_err(|e| self.explain(e))?;
        }
        Ok(cache)
    }

    /// Turn a library error into what the user gets to see.
    ///
    /// Outside development mode this is only the hint.
    pub fn explain(&self, err: Error) -> anyhow::Error {
        anyhow!(err.user_message(self.config.dev))
    }
}

/// A spinner on stderr, hidden when stderr is not a terminal.
pub fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use edea_repo::output::ColorChoice;

use crate::commands::{self, Context};

/// EDeA repository cache - mirror module repositories and inspect their content
#[derive(Parser, Debug)]
#[command(name = "edea-repo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./config.yml, then /etc/edead.yml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root directory of the repository cache
    #[arg(long, global = true, value_name = "DIR", env = "REPO_CACHE_BASE")]
    cache_root: Option<PathBuf>,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a repository to the cache, cloning it if needed
    Add(commands::add::AddArgs),
    /// List cached repositories
    List(commands::list::ListArgs),
    /// Fetch or pull cached repositories
    Update(commands::update::UpdateArgs),
    /// Print the directory of a (sub-)module
    Path(commands::path::PathArgs),
    /// Print a file at a revision
    Show(commands::show::ShowArgs),
    /// Print the readme of a (sub-)module
    Readme(commands::readme::ReadmeArgs),
    /// Print the commit history of a (sub-)module
    History(commands::history::HistoryArgs),
    /// Build the mdbook documentation of a (sub-)module
    Docs(commands::docs::DocsArgs),
    /// Export the schematics of a (sub-)module as SVG
    Schematics(commands::schematics::SchematicsArgs),
    /// Plot a (sub-)module at two revisions
    Diff(commands::diff::DiffArgs),
    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let Cli {
            command,
            config,
            cache_root,
            color,
            ..
        } = self;

        if let Commands::Completions(args) = command {
            return commands::completions::execute(args);
        }

        let ctx = Context::load(config.as_deref(), cache_root, ColorChoice::parse(&color))?;

        match command {
            Commands::Add(args) => commands::add::execute(&ctx, args),
            Commands::List(args) => commands::list::execute(&ctx, args),
            Commands::Update(args) => commands::update::execute(&ctx, args),
            Commands::Path(args) => commands::path::execute(&ctx, args),
            Commands::Show(args) => commands::show::execute(&ctx, args),
            Commands::Readme(args) => commands::readme::execute(&ctx, args),
            Commands::History(args) => commands::history::execute(&ctx, args),
            Commands::Docs(args) => commands::docs::execute(&ctx, args),
            Commands::Schematics(args) => commands::schematics::execute(&ctx, args),
            Commands::Diff(args) => commands::diff::execute(&ctx, args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

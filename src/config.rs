//! # Service Configuration
//!
//! Settings are read from a YAML file and then overridden from the
//! environment:
//!
//! ```yaml
//! dev: false
//! cache:
//!   repo:
//!     base: /var/cache/edea/git
//!   book:
//!     base: /var/cache/edea/book
//! git:
//!   clone_timeout_secs: 60
//! tools:
//!   python: python3
//!   merge: edea
//!   plotpcb: /opt/edea/plotpcb.py
//!   timeout_secs: 60
//! ```
//!
//! Without an explicit path the first existing file of [`SEARCH_PATH`] is
//! used, falling back to built-in defaults. The environment variables
//! `REPO_CACHE_BASE`, `BOOK_CACHE_BASE`, `MERGE_TOOL`, `PLOTPCB` and `IS_DEV`
//! take precedence over the file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::artifacts::Toolchain;
use crate::cache::{CacheOptions, CLONE_TIMEOUT, GIT_TIMEOUT};
use crate::defaults;
use crate::error::{Error, Result};

/// Files probed, in order, when no configuration file is given.
pub const SEARCH_PATH: [&str; 2] = ["config.yml", "/etc/edead.yml"];

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Development mode: show tool logs to users.
    pub dev: bool,
    pub cache: CacheSection,
    pub git: GitSection,
    pub tools: Toolchain,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Root of the repository cache.
    pub repo: BaseDir,
    /// Root of rendered documentation.
    pub book: BaseDir,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseDir {
    pub base: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSection {
    pub clone_timeout_secs: u64,
    /// Budget of fetch, pull and content reads.
    pub timeout_secs: u64,
}

impl Default for GitSection {
    fn default() -> Self {
        Self {
            clone_timeout_secs: CLONE_TIMEOUT.as_secs(),
            timeout_secs: GIT_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Parse a YAML configuration document.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| Error::Config {
            message: e.to_string(),
        })
    }

    /// Read and parse the configuration file at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("could not read {}: {}", path.display(), e),
        })?;
        Self::parse(&raw)
    }

    /// Load the configuration the service starts with.
    ///
    /// An explicit `path` has to exist. Environment overrides are applied
    /// and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match SEARCH_PATH.iter().map(Path::new).find(|p| p.is_file()) {
                Some(found) => {
                    debug!("using configuration {}", found.display());
                    Self::from_file(found)?
                }
                None => {
                    debug!("no configuration file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides looked up by environment variable name.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let set = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(base) = set("REPO_CACHE_BASE") {
            self.cache.repo.base = Some(PathBuf::from(base));
        }
        if let Some(base) = set("BOOK_CACHE_BASE") {
            self.cache.book.base = Some(PathBuf::from(base));
        }
        if let Some(merge) = set("MERGE_TOOL") {
            self.tools.merge = merge;
        }
        if let Some(plotpcb) = set("PLOTPCB") {
            self.tools.plotpcb = plotpcb;
        }
        if let Some(dev) = set("IS_DEV") {
            self.dev = parse_bool(&dev).ok_or_else(|| Error::Config {
                message: format!("IS_DEV must be true or false, got {:?}", dev),
            })?;
        }
        Ok(())
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.git.clone_timeout_secs == 0 || self.git.timeout_secs == 0 {
            return Err(Error::Config {
                message: "git timeouts must be greater than zero".to_string(),
            });
        }
        if self.tools.timeout_secs == 0 {
            return Err(Error::Config {
                message: "tools.timeout_secs must be greater than zero".to_string(),
            });
        }
        let tools = [
            ("python", &self.tools.python),
            ("merge", &self.tools.merge),
            ("plotpcb", &self.tools.plotpcb),
            ("plotkicadsch", &self.tools.plotkicadsch),
            ("svgcleaner", &self.tools.svgcleaner),
            ("mdbook", &self.tools.mdbook),
        ];
        if let Some((name, _)) = tools.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(Error::Config {
                message: format!("tools.{} must not be empty", name),
            });
        }
        Ok(())
    }

    /// Root of the repository cache.
    pub fn repo_cache_root(&self) -> PathBuf {
        self.cache
            .repo
            .base
            .clone()
            .unwrap_or_else(defaults::default_cache_root)
    }

    /// Root of the rendered documentation.
    pub fn book_root(&self) -> PathBuf {
        self.cache
            .book
            .base
            .clone()
            .unwrap_or_else(defaults::default_book_root)
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            clone_timeout: Duration::from_secs(self.git.clone_timeout_secs),
            git_timeout: Duration::from_secs(self.git.timeout_secs),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

//! # EDeA Repository Library
//!
//! Mirrors the git repositories behind published hardware-design modules
//! and serves their content: files at any revision, module history, readmes,
//! documentation and plots. It is used by the `edea-repo` command-line tool
//! and by the web service rendering module pages.
//!
//! ## Quick Example
//!
//! ```no_run
//! use edea_repo::cache::{CacheOptions, RepoCache};
//! use edea_repo::module::ModuleRef;
//!
//! # fn main() -> edea_repo::error::Result<()> {
//! let cache = RepoCache::open("/var/cache/edea/git", CacheOptions::default())?;
//!
//! let module = ModuleRef::new("https://gitlab.com/edea-dev/test-modules", "buck");
//! module.ensure(&cache)?;
//!
//! let readme = module.readme(&cache, "HEAD")?;
//! println!("{}", readme);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! - **Path resolution (`path`)**: a repository URL maps to
//!   `<cache root>/<host>/<owner>/<name>`. The mapping is pure and stable,
//!   the directory is the durable identity of a cached repository.
//! - **Repository cache (`cache`, `index`, `repository`)**: clones
//!   repositories at most once, records them in a persisted index and
//!   serializes writers against readers per repository.
//! - **Manifests (`manifest`)**: `edea.yml` maps sub-module names to
//!   directories inside one repository.
//! - **Content (`content`)**: files, listings and history at any revision,
//!   read from the object store without touching the working tree.
//! - **Artifacts (`artifacts`)**: plots, diffs, docs, metadata and bench
//!   merges produced by external tools under a deadline.
//! - **Modules (`module`)**: ties the above together for a
//!   (repository, sub-module) pair.
//!
//! The cache is an explicitly constructed value. Create it once at startup
//! from [`config::Config`] and pass it to whatever needs it.

pub mod artifacts;
pub mod cache;
pub mod config;
pub mod content;
pub mod defaults;
pub mod error;
pub mod git;
pub mod index;
pub mod manifest;
pub mod module;
pub mod output;
pub mod path;
pub mod process;
pub mod repository;

#[cfg(test)]
mod path_proptest;

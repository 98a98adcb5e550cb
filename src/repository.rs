//! # VCS Backends
//!
//! The repository cache does not talk to git directly. It goes through the
//! [`VcsBackend`] capability trait, which covers the operations that mutate
//! a mirrored repository: clone, fetch, pull and size reporting.
//!
//! ## Design
//!
//! - **`VcsBackend`**: the capability interface. Git is the only compiled-in
//!   implementation, but the cache logic is written against the trait so a
//!   second backend can be added without touching it. Tests use it to inject
//!   backends that count clones or fail on purpose.
//!
//! - **`GitBackend`**: wraps the functions in [`crate::git`], which shell out
//!   to the system `git` command.
//!
//! Every operation receives a [`Deadline`]; exceeding it kills the
//! underlying process and surfaces [`crate::error::Error::Timeout`].

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::Result;
use crate::process::Deadline;

/// Outcome of a fetch or pull.
///
/// "Already up to date" is not an error, but callers may want to log the
/// two cases differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Updated,
    AlreadyUpToDate,
}

/// Which kind of VCS a cached repository is mirrored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    Git,
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsKind::Git => write!(f, "git"),
        }
    }
}

/// Capability interface of a VCS backend - allows mocking in tests
pub trait VcsBackend: Send + Sync {
    /// The kind of repositories this backend produces.
    fn kind(&self) -> VcsKind;

    /// Clones `url` into the (existing, empty) directory `dest`.
    ///
    /// A remote without commits is reported as
    /// [`crate::error::Error::EmptyRemoteRepository`].
    fn clone_repo(&self, url: &str, dest: &Path, deadline: Deadline) -> Result<()>;

    /// Updates remote tracking refs of the repository at `path`.
    fn fetch(&self, path: &Path, deadline: Deadline) -> Result<FetchOutcome>;

    /// Brings the working tree at `path` up to date with its upstream.
    fn pull(&self, path: &Path, deadline: Deadline) -> Result<FetchOutcome>;

    /// Bytes used on disk by the repository at `path`.
    fn size(&self, path: &Path) -> Result<u64> {
        let mut total = 0;
        for entry in WalkDir::new(path) {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() {
                total += entry.metadata().map_err(std::io::Error::from)?.len();
            }
        }
        Ok(total)
    }
}

/// The default implementation of `VcsBackend`, which uses the system's
/// `git` command to perform real Git operations.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitBackend;

impl VcsBackend for GitBackend {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn clone_repo(&self, url: &str, dest: &Path, deadline: Deadline) -> Result<()> {
        crate::git::clone(url, dest, deadline)
    }

    fn fetch(&self, path: &Path, deadline: Deadline) -> Result<FetchOutcome> {
        crate::git::fetch(path, deadline)
    }

    fn pull(&self, path: &Path, deadline: Deadline) -> Result<FetchOutcome> {
        crate::git::pull(path, deadline)
    }
}

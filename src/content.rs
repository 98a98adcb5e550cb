//! Revision-scoped access to the content of a cached repository
//!
//! A [`RepoContent`] reads files, file listings and history straight from the
//! object store of a checkout, at any revision git understands (branch, tag,
//! `HEAD~2`, a commit hash). The working tree is never touched, so reads at
//! different revisions can run side by side.
//!
//! Obtain one through [`crate::cache::RepoCache::with_content`], which holds
//! the repository's read lock while the accessor is in use.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::git::{self, TreeEntry};
use crate::manifest::{self, SubModule, MANIFEST_FILE, README_FILE};
use crate::path::{sanitize_relative, to_git_path};
use crate::process::Deadline;

/// A file read from the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitFile {
    /// File name without directory.
    pub name: String,
    pub content: Vec<u8>,
}

/// A commit in the history of a (sub-)module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub hash: String,
    pub author: String,
    pub time: DateTime<Utc>,
    pub message: String,
}

impl Commit {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// Commits older than this are never reported.
pub fn history_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Reads content of one checkout at arbitrary revisions.
#[derive(Debug, Clone)]
pub struct RepoContent {
    path: PathBuf,
    timeout: Duration,
}

impl RepoContent {
    /// Accessor for the checkout at `path`; every git call gets `timeout`.
    pub fn new(path: &Path, timeout: Duration) -> Self {
        Self {
            path: path.to_path_buf(),
            timeout,
        }
    }

    /// Location of the checkout.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.timeout)
    }

    /// Resolve `revision` to a commit hash.
    pub fn resolve(&self, revision: &str) -> Result<String> {
        git::resolve_revision(&self.path, revision, self.deadline())
    }

    /// Every blob in the tree of `revision`.
    pub fn tree_at(&self, revision: &str) -> Result<Vec<TreeEntry>> {
        let deadline = self.deadline();
        let commit = git::resolve_revision(&self.path, revision, deadline)?;
        git::list_tree(&self.path, &commit, deadline)
    }

    /// Raw content of a tree entry.
    pub fn read(&self, entry: &TreeEntry) -> Result<Vec<u8>> {
        git::read_blob(&self.path, &entry.oid, self.deadline())
    }

    /// Content of the file `name` (a path from the repository root) at
    /// `revision`.
    ///
    /// Without `case_sensitive` the name matches any capitalisation. If
    /// several files match, which one is returned is unspecified. Binary
    /// files are reported as `NoFile`.
    pub fn file_at(&self, name: &str, case_sensitive: bool, revision: &str) -> Result<Vec<u8>> {
        let no_file = || Error::NoFile {
            name: name.to_string(),
            revision: revision.to_string(),
        };

        let tree = self.tree_at(revision)?;
        let entry = tree
            .iter()
            .find(|entry| name_matches(&entry.path, name, case_sensitive))
            .ok_or_else(no_file)?;

        let content = self.read(entry)?;
        if git::is_binary(&content) {
            debug!("{} at {} is binary", entry.path, revision);
            return Err(no_file());
        }
        Ok(content)
    }

    /// Like [`RepoContent::file_at`], decoded as text.
    pub fn text_at(&self, name: &str, case_sensitive: bool, revision: &str) -> Result<String> {
        let content = self.file_at(name, case_sensitive, revision)?;
        Ok(String::from_utf8_lossy(&content).into_owned())
    }

    /// All files directly inside `dir` whose name ends in `ext` at `revision`.
    ///
    /// `ext` includes the dot, e.g. `.kicad_pcb`. `dir` is sanitized like a
    /// manifest directory; an empty `dir` is the repository root.
    pub fn files_by_ext_at(&self, dir: &str, ext: &str, revision: &str) -> Result<Vec<GitFile>> {
        let dir = to_git_path(&sanitize_relative(dir));
        let mut files = Vec::new();
        for entry in self.tree_at(revision)? {
            if parent_of(&entry.path) == dir && entry.path.ends_with(ext) {
                files.push(GitFile {
                    name: file_name(&entry.path).to_string(),
                    content: self.read(&entry)?,
                });
            }
        }
        Ok(files)
    }

    /// The first file found by [`RepoContent::files_by_ext_at`], or `NoFile`.
    pub fn file_by_ext_at(&self, dir: &str, ext: &str, revision: &str) -> Result<GitFile> {
        self.files_by_ext_at(dir, ext, revision)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoFile {
                name: format!("{}/*{}", dir.trim_end_matches('/'), ext),
                revision: revision.to_string(),
            })
    }

    /// Commits reachable from HEAD with a commit time in `since..=until`,
    /// newest first.
    ///
    /// A non-empty `path_filter` keeps only commits touching a path that
    /// starts with it. A repository without commits has an empty history.
    pub fn history_at(
        &self,
        path_filter: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Commit>> {
        let deadline = self.deadline();
        if !git::has_commits(&self.path, deadline)? {
            return Ok(Vec::new());
        }

        let commits = git::log(&self.path, "HEAD", since, until, deadline)?
            .into_iter()
            .filter(|entry| {
                path_filter.is_empty()
                    || entry.files.iter().any(|f| f.starts_with(path_filter))
            })
            .map(|entry| Commit {
                hash: entry.hash,
                author: entry.author,
                time: entry.time,
                message: entry.message,
            })
            .collect();
        Ok(commits)
    }

    /// History from the fixed epoch until now.
    pub fn history(&self, path_filter: &str) -> Result<Vec<Commit>> {
        self.history_at(path_filter, history_epoch(), Utc::now())
    }

    /// The `edea.yml` at `revision`, `None` if there is none.
    pub fn manifest_at(&self, revision: &str) -> Result<Option<String>> {
        match self.text_at(MANIFEST_FILE, false, revision) {
            Ok(raw) => Ok(Some(raw)),
            Err(Error::NoFile { .. }) => Ok(None),
            Err(Error::UnknownRevision { .. })
                if !git::has_commits(&self.path, self.deadline())? =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve sub-module `sub` through the manifest at `revision`.
    pub fn sub_module(&self, sub: &str, revision: &str) -> Result<SubModule> {
        let raw = self.manifest_at(revision)?;
        manifest::resolve(raw.as_deref(), sub)
    }

    /// The repository readme at `revision`.
    pub fn readme(&self, revision: &str) -> Result<String> {
        self.text_at(README_FILE, false, revision)
    }

    /// The readme of sub-module `sub` at `revision`.
    pub fn sub_module_readme(&self, sub: &str, revision: &str) -> Result<String> {
        let (path, case_sensitive) = self.sub_module(sub, revision)?.readme_path();
        self.text_at(&path, case_sensitive, revision)
    }

    /// Whether sub-module `sub` ships mdbook documentation.
    ///
    /// An empty `book.toml` is an error rather than "no docs".
    pub fn has_docs(&self, sub: &str, revision: &str) -> Result<bool> {
        let book = self.sub_module(sub, revision)?.book_toml_path();
        match self.file_at(&book, false, revision) {
            Ok(content) if content.iter().all(u8::is_ascii_whitespace) => {
                Err(Error::EmptyBook { path: book })
            }
            Ok(_) => Ok(true),
            Err(Error::NoFile { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The documentation folder of sub-module `sub`.
    pub fn docs_dir(&self, sub: &str, revision: &str) -> Result<String> {
        Ok(self.sub_module(sub, revision)?.doc_dir())
    }

    /// Write every file below `dir` at `revision` into `dest`, keeping the
    /// layout relative to `dir`. Returns the written paths.
    pub fn export_dir(&self, dir: &str, revision: &str, dest: &Path) -> Result<Vec<PathBuf>> {
        let dir = to_git_path(&sanitize_relative(dir));
        let mut written = Vec::new();
        for entry in self.tree_at(revision)? {
            let Some(relative) = strip_dir(&entry.path, &dir) else {
                continue;
            };
            let target = dest.join(sanitize_relative(relative));
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, self.read(&entry)?)?;
            written.push(target);
        }
        debug!(
            "exported {} files of {}/{} at {}",
            written.len(),
            self.path.display(),
            dir,
            revision
        );
        Ok(written)
    }
}

fn name_matches(path: &str, name: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        path == name
    } else {
        path.to_lowercase() == name.to_lowercase()
    }
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or_default()
}

fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

/// `path` relative to `dir`, if it lies below it.
fn strip_dir<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    if dir.is_empty() {
        return Some(path);
    }
    path.strip_prefix(dir)?.strip_prefix('/')
}

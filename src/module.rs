//! Module-level entry points
//!
//! A published module is identified by a repository URL plus an optional
//! sub-module name. [`ModuleRef`] carries the two and wires them through the
//! cache, the manifest, the content accessor and the artifact pipeline, which
//! is all a consumer such as a web view needs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde_json::Value;

use crate::artifacts::{Book, DiffPlots, MergedBench, Pipeline};
use crate::cache::{AddOutcome, RepoCache};
use crate::content::{Commit, RepoContent};
use crate::error::Result;
use crate::path::{sanitize_relative, RepoUrl};

/// The revision used when none is given.
pub const DEFAULT_REVISION: &str = "HEAD";

/// A (repository, sub-module) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleRef {
    pub repo_url: String,
    /// Sub-module name from `edea.yml`, empty for the whole repository.
    pub sub: String,
}

impl ModuleRef {
    pub fn new(repo_url: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            sub: sub.into(),
        }
    }

    /// Make sure the repository is mirrored.
    pub fn ensure(&self, cache: &RepoCache) -> Result<AddOutcome> {
        cache.add(&self.repo_url)
    }

    fn dir_in(&self, content: &RepoContent, revision: &str) -> Result<PathBuf> {
        Ok(content
            .sub_module(&self.sub, revision)?
            .absolute(content.path()))
    }

    /// Absolute directory of the module in the checkout.
    pub fn path(&self, cache: &RepoCache, revision: &str) -> Result<PathBuf> {
        cache.with_content(&self.repo_url, |content| self.dir_in(content, revision))
    }

    /// Directory of the module relative to the repository root.
    pub fn relative_dir(&self, cache: &RepoCache, revision: &str) -> Result<String> {
        cache.with_content(&self.repo_url, |content| {
            Ok(content.sub_module(&self.sub, revision)?.dir)
        })
    }

    /// The module readme at `revision`.
    pub fn readme(&self, cache: &RepoCache, revision: &str) -> Result<String> {
        cache.with_content(&self.repo_url, |content| {
            if self.sub.is_empty() {
                content.readme(revision)
            } else {
                content.sub_module_readme(&self.sub, revision)
            }
        })
    }

    /// Commits touching the module directory.
    pub fn history(&self, cache: &RepoCache) -> Result<Vec<Commit>> {
        cache.with_content(&self.repo_url, |content| {
            let dir = content.sub_module(&self.sub, DEFAULT_REVISION)?.dir;
            content.history(&dir)
        })
    }

    pub fn has_docs(&self, cache: &RepoCache, revision: &str) -> Result<bool> {
        cache.with_content(&self.repo_url, |content| {
            content.has_docs(&self.sub, revision)
        })
    }

    /// Render the module documentation into `dest`.
    pub fn build_docs(
        &self,
        cache: &RepoCache,
        pipeline: &Pipeline,
        revision: &str,
        dest: &Path,
    ) -> Result<Book> {
        cache.with_content(&self.repo_url, |content| {
            let doc_dir = content.docs_dir(&self.sub, revision)?;
            pipeline.build_docs(content, &doc_dir, revision, dest)
        })
    }

    /// Default output folder for the documentation below `book_base`.
    pub fn book_dest(&self, book_base: &Path) -> Result<PathBuf> {
        let mut dest = book_base.join(RepoUrl::parse(&self.repo_url)?.relative_path());
        if !self.sub.is_empty() {
            dest.push(sanitize_relative(&self.sub));
        }
        Ok(dest)
    }

    /// Schematic SVGs of the module at `revision`, keyed by file name.
    pub fn export_schematics(
        &self,
        cache: &RepoCache,
        pipeline: &Pipeline,
        revision: &str,
    ) -> Result<BTreeMap<String, String>> {
        cache.with_content(&self.repo_url, |content| {
            let dir = content.sub_module(&self.sub, revision)?.dir;
            pipeline.export_schematics(content, &dir, revision)
        })
    }

    pub fn plot_pcb(&self, cache: &RepoCache, pipeline: &Pipeline, revision: &str) -> Result<Value> {
        cache.with_content(&self.repo_url, |content| {
            let dir = content.sub_module(&self.sub, revision)?.dir;
            pipeline.plot_pcb(content, &dir, revision)
        })
    }

    /// Plots of the module at revisions `a` and `b`.
    ///
    /// The module directory is resolved at `b`.
    pub fn plot_diff(
        &self,
        cache: &RepoCache,
        pipeline: &Pipeline,
        a: &str,
        b: &str,
    ) -> Result<DiffPlots> {
        cache.with_content(&self.repo_url, |content| {
            let dir = content.sub_module(&self.sub, b)?.dir;
            pipeline.plot_diff(content, &dir, a, b)
        })
    }

    /// Metadata of the checked out module.
    pub fn metadata(
        &self,
        cache: &RepoCache,
        pipeline: &Pipeline,
    ) -> Result<serde_json::Map<String, Value>> {
        cache.with_content(&self.repo_url, |content| {
            let dir = self.dir_in(content, DEFAULT_REVISION)?;
            pipeline.extract_metadata(&dir)
        })
    }
}

/// Merge `modules` into a bench called `bench_name`.
///
/// Read locks of all involved repositories are held while the merge tool
/// runs.
pub fn merge_bench(
    cache: &RepoCache,
    pipeline: &Pipeline,
    bench_name: &str,
    modules: &[ModuleRef],
) -> Result<MergedBench> {
    let mut urls: Vec<&str> = modules.iter().map(|m| m.repo_url.as_str()).collect();
    urls.sort_unstable();
    urls.dedup();

    read_all(cache, &urls, || {
        let timeout = cache.options().git_timeout;
        let mut dirs = Vec::with_capacity(modules.len());
        for module in modules {
            let content = RepoContent::new(&cache.location(&module.repo_url)?, timeout);
            dirs.push(module.dir_in(&content, DEFAULT_REVISION)?);
        }
        debug!("merging bench {} from {:?}", bench_name, dirs);
        pipeline.merge_modules(bench_name, &dirs)
    })
}

/// Hold the read locks of `urls`, taken in order, while `f` runs.
fn read_all<T>(cache: &RepoCache, urls: &[&str], f: impl FnOnce() -> Result<T>) -> Result<T> {
    match urls.split_first() {
        None => f(),
        Some((first, rest)) => cache.read(first, |_| read_all(cache, rest, f)),
    }
}

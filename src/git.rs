//! Git plumbing on top of the system `git` command
//!
//! Using the system binary means SSH keys, credential helpers and anything
//! else configured in `~/.gitconfig` work without extra setup. Every call is
//! bounded by a [`Deadline`].

use std::fs;
use std::path::Path;
use std::process::Command;

use chrono::{DateTime, TimeZone, Utc};
use log::debug;

use crate::error::{Error, Result};
use crate::process::{self, Deadline, Output};
use crate::repository::FetchOutcome;

/// Printed by `git clone` when the remote has no commits yet.
const EMPTY_CLONE_MARKER: &str = "cloned an empty repository";

/// Bytes inspected when deciding whether a blob is binary.
const BINARY_SNIFF_LEN: usize = 8000;

const RECORD_SEP: char = '\x1e';
const FIELD_SEP: char = '\x1f';

/// One blob in a commit's tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Full path from the repository root, `/` separated.
    pub path: String,
    pub oid: String,
    pub mode: String,
}

/// One commit as reported by `git log`.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub hash: String,
    pub author: String,
    pub time: DateTime<Utc>,
    pub message: String,
    /// Paths touched by the commit.
    pub files: Vec<String>,
}

fn base_command() -> Command {
    let mut cmd = Command::new("git");
    // never block on an interactive credential prompt
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

/// Run a git subcommand inside `repo` and fail on a non-zero exit status.
fn git(repo: &Path, args: &[&str], deadline: Deadline) -> Result<Output> {
    let mut cmd = base_command();
    cmd.arg("-C")
        .arg(repo)
        .args(["-c", "core.quotepath=off"])
        .args(args);
    let output = process::run(&mut cmd, deadline)?;
    if !output.success() {
        return Err(Error::GitCommand {
            command: args.join(" "),
            path: repo.to_path_buf(),
            stderr: output.stderr_string().trim().to_string(),
        });
    }
    Ok(output)
}

/// Clone `url` into `target_dir`, including submodules.
///
/// `target_dir` may exist as long as it is empty. A remote without commits
/// yields [`Error::EmptyRemoteRepository`] while leaving a valid, empty
/// clone behind.
pub fn clone(url: &str, target_dir: &Path, deadline: Deadline) -> Result<()> {
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut cmd = base_command();
    cmd.args(["clone", "--recurse-submodules", "--"])
        .arg(url)
        .arg(target_dir);
    let output = process::run(&mut cmd, deadline)?;
    let stderr = output.stderr_string();

    if !output.success() {
        return Err(Error::GitClone {
            url: url.to_string(),
            message: stderr.trim().to_string(),
            hint: clone_hint(&stderr),
        });
    }

    if stderr.contains(EMPTY_CLONE_MARKER) {
        return Err(Error::EmptyRemoteRepository {
            url: url.to_string(),
        });
    }

    Ok(())
}

/// Hint for a failed clone, from git's stderr.
///
/// A missing repository also prints "Could not read from remote repository",
/// so the missing-repository patterns are checked first.
fn clone_hint(stderr: &str) -> Option<String> {
    if stderr.contains("does not appear to be a git repository")
        || stderr.contains("not found")
        || stderr.contains("does not exist")
    {
        Some("Check that the repository URL is spelled correctly".to_string())
    } else if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
        || stderr.contains("could not read Username")
    {
        Some(
            "Make sure the repository is public or that git credentials \
             (SSH key, credential helper, access token) are configured"
                .to_string(),
        )
    } else {
        None
    }
}

fn remote_refs(repo: &Path, deadline: Deadline) -> Result<String> {
    let output = git(
        repo,
        &[
            "for-each-ref",
            "--format=%(objectname) %(refname)",
            "refs/remotes",
            "refs/tags",
        ],
        deadline,
    )?;
    Ok(output.stdout_string())
}

/// Fetch from `origin`. Reports whether any remote ref moved.
pub fn fetch(repo: &Path, deadline: Deadline) -> Result<FetchOutcome> {
    let before = remote_refs(repo, deadline)?;
    git(repo, &["fetch", "--prune", "--tags", "origin"], deadline)?;
    let after = remote_refs(repo, deadline)?;

    if before == after {
        Ok(FetchOutcome::AlreadyUpToDate)
    } else {
        Ok(FetchOutcome::Updated)
    }
}

/// Fast-forward the checked out branch from its upstream.
pub fn pull(repo: &Path, deadline: Deadline) -> Result<FetchOutcome> {
    let before = head(repo, deadline)?;
    git(
        repo,
        &["pull", "--ff-only", "--recurse-submodules"],
        deadline,
    )?;
    let after = head(repo, deadline)?;

    if before == after {
        Ok(FetchOutcome::AlreadyUpToDate)
    } else {
        Ok(FetchOutcome::Updated)
    }
}

/// The commit HEAD points to, `None` for a repository without commits.
pub fn head(repo: &Path, deadline: Deadline) -> Result<Option<String>> {
    if !has_commits(repo, deadline)? {
        return Ok(None);
    }
    resolve_revision(repo, "HEAD", deadline).map(Some)
}

/// True once the repository contains at least one commit.
pub fn has_commits(repo: &Path, deadline: Deadline) -> Result<bool> {
    let output = git(repo, &["rev-list", "-n", "1", "--all"], deadline)?;
    Ok(!output.stdout_string().trim().is_empty())
}

/// Resolve anything `git rev-parse` understands (branch, tag, `HEAD~2`, ...)
/// to a commit hash.
pub fn resolve_revision(repo: &Path, revision: &str, deadline: Deadline) -> Result<String> {
    if revision.is_empty() || revision.starts_with('-') {
        return Err(Error::UnknownRevision {
            revision: revision.to_string(),
            message: "not a valid revision".to_string(),
        });
    }

    let spec = format!("{}^{{commit}}", revision);
    let mut cmd = base_command();
    cmd.arg("-C")
        .arg(repo)
        .args(["rev-parse", "--verify", "--quiet", &spec]);
    let output = process::run(&mut cmd, deadline)?;
    let hash = output.stdout_string().trim().to_string();

    if !output.success() || hash.is_empty() {
        return Err(Error::UnknownRevision {
            revision: revision.to_string(),
            message: format!(
                "could not be resolved in {}",
                repo.display()
            ),
        });
    }
    Ok(hash)
}

/// All blobs reachable from `commit`'s tree, sorted by path.
///
/// Submodule entries are skipped.
pub fn list_tree(repo: &Path, commit: &str, deadline: Deadline) -> Result<Vec<TreeEntry>> {
    let output = git(repo, &["ls-tree", "-r", "-z", "--full-tree", commit], deadline)?;
    Ok(parse_tree(&output.stdout_string()))
}

fn parse_tree(raw: &str) -> Vec<TreeEntry> {
    raw.split('\0')
        .filter_map(|record| {
            let (meta, path) = record.split_once('\t')?;
            let mut fields = meta.split(' ');
            let mode = fields.next()?;
            let kind = fields.next()?;
            let oid = fields.next()?;
            (kind == "blob").then(|| TreeEntry {
                path: path.to_string(),
                oid: oid.to_string(),
                mode: mode.to_string(),
            })
        })
        .collect()
}

/// Raw content of a blob.
pub fn read_blob(repo: &Path, oid: &str, deadline: Deadline) -> Result<Vec<u8>> {
    Ok(git(repo, &["cat-file", "blob", oid], deadline)?.stdout)
}

/// Same heuristic git uses: a NUL byte near the start marks binary content.
pub fn is_binary(content: &[u8]) -> bool {
    content.iter().take(BINARY_SNIFF_LEN).any(|b| *b == 0)
}

/// Commits reachable from `from` with a commit time in `since..=until`,
/// newest first, including the files each commit touched.
pub fn log(
    repo: &Path,
    from: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    deadline: Deadline,
) -> Result<Vec<LogEntry>> {
    let since_arg = format!("--since={}", since.format("%Y-%m-%d %H:%M:%S +0000"));
    let until_arg = format!("--until={}", until.format("%Y-%m-%d %H:%M:%S +0000"));
    let output = git(
        repo,
        &[
            "log",
            "--name-only",
            "--format=%x1e%H%x1f%an%x1f%ct%x1f%B%x1f",
            &since_arg,
            &until_arg,
            from,
            "--",
        ],
        deadline,
    )?;

    let entries: Vec<LogEntry> = parse_log(&output.stdout_string())
        .into_iter()
        .filter(|entry| entry.time >= since && entry.time <= until)
        .collect();
    debug!("git log {} returned {} commits", repo.display(), entries.len());
    Ok(entries)
}

fn parse_log(raw: &str) -> Vec<LogEntry> {
    raw.split(RECORD_SEP)
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| {
            let mut fields = record.splitn(5, FIELD_SEP);
            let hash = fields.next()?.trim().to_string();
            let author = fields.next()?.to_string();
            let timestamp: i64 = fields.next()?.trim().parse().ok()?;
            let message = fields.next()?.trim().to_string();
            let files = fields
                .next()
                .unwrap_or_default()
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            let time = Utc.timestamp_opt(timestamp, 0).single()?;
            Some(LogEntry {
                hash,
                author,
                time,
                message,
                files,
            })
        })
        .collect()
}

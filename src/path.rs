//! Path resolution for the repository cache
//!
//! Every cached repository lives at `<cache root>/<host>/<owner>/<name>`.
//! The layout is recomputed from the URL on every lookup, so it has to stay
//! stable across releases for cache hits to keep working.

use std::path::{Component, Path, PathBuf};

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};

/// scp-like git addresses, e.g. `git@github.com:owner/repo.git`
const SCP_PATTERN: &str = r"^(?:[^@/:]+@)?(?P<host>[A-Za-z0-9][A-Za-z0-9.\-]*):(?P<path>[^/].*)$";

/// The segments of a repository URL that make up its cache location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    /// Lower-cased host name without port.
    pub host: String,
    /// Owner, user or group. Nested groups are joined with `/`.
    pub owner: String,
    /// Repository name without a trailing `.git`.
    pub name: String,
}

impl RepoUrl {
    /// Parse a VCS URL into host, owner and repository name.
    ///
    /// Accepts `http(s)://`, `ssh://`, `git://`, scp-like `user@host:path`
    /// and scheme-less `host/owner/name` forms.
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(invalid(url, "empty URL"));
        }

        let (host, path) = if trimmed.contains("://") {
            let parsed = Url::parse(trimmed)?;
            let host = parsed
                .host_str()
                .ok_or_else(|| invalid(url, "missing host"))?
                .to_string();
            (host, parsed.path().to_string())
        } else {
            let scp = Regex::new(SCP_PATTERN)?;
            if let Some(captures) = scp.captures(trimmed) {
                (captures["host"].to_string(), captures["path"].to_string())
            } else {
                let parsed = Url::parse(&format!("https://{}", trimmed))?;
                let host = parsed
                    .host_str()
                    .ok_or_else(|| invalid(url, "missing host"))?
                    .to_string();
                (host, parsed.path().to_string())
            }
        };

        let mut segments: Vec<&str> = Vec::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            // GitLab style sub-resources: `group/repo/-/tree/main`
            if segment == "-" {
                break;
            }
            if segment == "." || segment == ".." || segment.contains('\\') {
                return Err(invalid(url, "path traversal in URL"));
            }
            segments.push(segment);
        }

        if segments.len() < 2 {
            return Err(invalid(url, "expected host/owner/name"));
        }

        let last = segments.pop().unwrap_or_default();
        let name = last.strip_suffix(".git").unwrap_or(last);
        if name.is_empty() {
            return Err(invalid(url, "empty repository name"));
        }

        Ok(Self {
            host: host.to_lowercase(),
            owner: segments.join("/"),
            name: name.to_string(),
        })
    }

    /// Location relative to the cache root.
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::from(&self.host);
        for part in self.owner.split('/') {
            path.push(part);
        }
        path.push(&self.name);
        path
    }
}

fn invalid(url: &str, reason: &str) -> Error {
    Error::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

/// Resolve the on-disk cache location of a repository URL.
///
/// This is a pure function of `cache_root` and `url`.
pub fn resolve(cache_root: &Path, url: &str) -> Result<PathBuf> {
    Ok(cache_root.join(RepoUrl::parse(url)?.relative_path()))
}

/// Sanitize a directory taken from a repository manifest.
///
/// `../` sequences and leading slashes are stripped, and whatever is left
/// that is not a plain path component is dropped, so the result can always
/// be joined below a repository root without escaping it.
pub fn sanitize_relative(dir: &str) -> PathBuf {
    let stripped = dir.replace("../", "");
    let stripped = stripped.trim_start_matches('/');
    Path::new(stripped)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

/// Join a manifest directory below `root` after sanitizing it.
pub fn join_sanitized(root: &Path, dir: &str) -> PathBuf {
    root.join(sanitize_relative(dir))
}

/// Render a relative path with forward slashes, the way git reports paths.
pub fn to_git_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

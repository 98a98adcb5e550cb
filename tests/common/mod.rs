//! Shared test utilities for integration and E2E tests.
//!
//! Repositories used by the tests are created on the fly with the `git` CLI
//! below a temporary directory, so no network access is needed. Remote URLs
//! of the form `https://example.test/<owner>/<name>` are mapped onto
//! `<remotes>/<owner>/<name>`:
//!
//! - library tests inject [`LocalBackend`] into the cache,
//! - CLI tests set git's `url.<base>.insteadOf` through [`insteadof_env`].
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//! ```

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use edea_repo::artifacts::Toolchain;
use edea_repo::cache::{CacheOptions, RepoCache};
use edea_repo::error::Result;
use edea_repo::git;
use edea_repo::index::FileIndex;
use edea_repo::path::RepoUrl;
use edea_repo::process::Deadline;
use edea_repo::repository::{FetchOutcome, VcsBackend, VcsKind};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use super::{
        git_available, insteadof_env, remote_url, should_skip_network_tests, GitFixture,
        LocalBackend, TestEnv,
    };
    #[cfg(unix)]
    #[allow(unused_imports)]
    pub use super::fake_toolchain;
    #[allow(unused_imports)]
    pub use tempfile::TempDir;
}

/// Host used for fake remote URLs.
pub const REMOTE_BASE: &str = "https://example.test/";

/// URL of the fake remote `<owner>/<name>`.
pub fn remote_url(owner: &str, name: &str) -> String {
    format!("{}{}/{}", REMOTE_BASE, owner, name)
}

/// Whether a usable `git` binary is on the PATH.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check if network tests should be skipped.
pub fn should_skip_network_tests() -> bool {
    std::env::var("SKIP_NETWORK_TESTS").is_ok()
}

/// Environment making git resolve `https://example.test/` to `remotes`.
pub fn insteadof_env(remotes: &Path) -> Vec<(String, String)> {
    vec![
        ("GIT_CONFIG_COUNT".to_string(), "1".to_string()),
        (
            "GIT_CONFIG_KEY_0".to_string(),
            format!("url.{}/.insteadOf", remotes.display()),
        ),
        ("GIT_CONFIG_VALUE_0".to_string(), REMOTE_BASE.to_string()),
    ]
}

fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
        .args(args)
        .env("GIT_AUTHOR_NAME", "Test Author")
        .env("GIT_AUTHOR_EMAIL", "author@example.test")
        .env("GIT_COMMITTER_NAME", "Test Author")
        .env("GIT_COMMITTER_EMAIL", "author@example.test")
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A repository with a working tree that tests commit into.
pub struct GitFixture {
    pub dir: PathBuf,
}

impl GitFixture {
    /// Initialise a new repository at `dir`.
    pub fn init(dir: &Path) -> Self {
        fs::create_dir_all(dir).unwrap();
        run_git(dir, &["init", "-q"]);
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Initialise a bare repository without any commits.
    pub fn init_bare(dir: &Path) -> Self {
        fs::create_dir_all(dir).unwrap();
        run_git(dir, &["init", "-q", "--bare"]);
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn write(&self, path: &str, content: impl AsRef<[u8]>) -> &Self {
        let target = self.dir.join(path);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(target, content).unwrap();
        self
    }

    /// Stage everything and commit. Returns the commit hash.
    pub fn commit(&self, message: &str) -> String {
        run_git(&self.dir, &["add", "-A"]);
        run_git(&self.dir, &["commit", "-q", "-m", message]);
        run_git(&self.dir, &["rev-parse", "HEAD"])
    }

    pub fn tag(&self, name: &str) {
        run_git(&self.dir, &["tag", name]);
    }
}

/// Backend cloning `https://example.test/<owner>/<name>` from local
/// repositories below `remotes`.
pub struct LocalBackend {
    pub remotes: PathBuf,
}

impl VcsBackend for LocalBackend {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn clone_repo(&self, url: &str, dest: &Path, deadline: Deadline) -> Result<()> {
        let parsed = RepoUrl::parse(url)?;
        let local = self.remotes.join(&parsed.owner).join(&parsed.name);
        git::clone(&local.to_string_lossy(), dest, deadline)
    }

    fn fetch(&self, path: &Path, deadline: Deadline) -> Result<FetchOutcome> {
        git::fetch(path, deadline)
    }

    fn pull(&self, path: &Path, deadline: Deadline) -> Result<FetchOutcome> {
        git::pull(path, deadline)
    }
}

/// A temporary cache root plus a directory of fake remotes.
pub struct TestEnv {
    pub temp: tempfile::TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            temp: tempfile::TempDir::new().unwrap(),
        }
    }

    pub fn remotes(&self) -> PathBuf {
        self.temp.path().join("remotes")
    }

    pub fn cache_root(&self) -> PathBuf {
        self.temp.path().join("cache")
    }

    /// A new working repository acting as remote `<owner>/<name>`.
    pub fn remote(&self, owner: &str, name: &str) -> GitFixture {
        GitFixture::init(&self.remotes().join(owner).join(name))
    }

    /// A cache backed by the fake remotes and an on-disk index.
    pub fn cache(&self) -> RepoCache {
        let root = self.cache_root();
        fs::create_dir_all(&root).unwrap();
        let index = FileIndex::open(root.join(edea_repo::index::INDEX_FILE)).unwrap();
        RepoCache::with_parts(
            root,
            Box::new(LocalBackend {
                remotes: self.remotes(),
            }),
            Box::new(index),
            CacheOptions {
                clone_timeout: Duration::from_secs(30),
                git_timeout: Duration::from_secs(30),
            },
        )
        .unwrap()
    }
}

const FAKE_PYTHON: &str = r#"#!/bin/sh
if [ "$1" = "-m" ]; then
  case "$3" in
    --extract-meta)
      printf '{"name":"%s"}' "$(basename "$4")"
      ;;
    --output)
      out="$4"
      shift 4
      mkdir -p "$out"
      for d in "$@"; do basename "$d" >> "$out/modules.txt"; done
      echo "merged $# modules"
      echo "fake merge" >&2
      ;;
    *)
      echo "unknown mode $3" >&2
      exit 2
      ;;
  esac
  exit 0
fi
printf '{"board":"%s","content":"%s"}' "$(basename "$2")" "$(cat "$2")"
"#;

const FAKE_PLOTKICADSCH: &str = r#"#!/bin/sh
sheet="$4"
printf '<svg>%s</svg>' "$(cat "$sheet")" > "${sheet%.sch}.svg"
"#;

const FAKE_SVGCLEANER: &str = r#"#!/bin/sh
echo "svgcleaner is not really here" >&2
exit 1
"#;

const FAKE_MDBOOK: &str = r#"#!/bin/sh
mkdir -p "$4"
cp "$2/book.toml" "$4/book.toml"
echo '<html></html>' > "$4/index.html"
echo "book built"
"#;

/// A toolchain of shell scripts written to `dir` that mimic the real
/// plotting and merge tools well enough to check the plumbing.
///
/// Tests spawning freshly written scripts must run `#[serial]`, otherwise a
/// concurrent fork can keep the script open for writing (`ETXTBSY`).
#[cfg(unix)]
pub fn fake_toolchain(dir: &Path) -> Toolchain {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).unwrap();
    let script = |name: &str, body: &str| -> String {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    };

    Toolchain {
        python: script("python", FAKE_PYTHON),
        merge: "edea".to_string(),
        plotpcb: "plotpcb.py".to_string(),
        plotkicadsch: script("plotkicadsch", FAKE_PLOTKICADSCH),
        svgcleaner: script("svgcleaner", FAKE_SVGCLEANER),
        mdbook: script("mdbook", FAKE_MDBOOK),
        timeout_secs: 30,
    }
}

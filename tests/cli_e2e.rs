//! End-to-end tests for the `edea-repo` binary.
//!
//! These tests invoke the actual CLI binary. Remotes are local repositories;
//! git is pointed at them through `url.<base>.insteadOf` set in the
//! environment, so `https://example.test/<owner>/<name>` never touches the
//! network.

mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use common::prelude::*;
use predicates::prelude::*;

/// A workspace with a config-free current directory, a cache root and the
/// `edea-dev/power` remote.
struct Workspace {
    env: TestEnv,
}

impl Workspace {
    fn new() -> Self {
        let env = TestEnv::new();
        let remote = env.remote("edea-dev", "power");
        remote
            .write("README.md", "# Power\n")
            .write("edea.yml", "modules:\n  buck:\n    dir: hw/buck\n")
            .write("hw/buck/readme.md", "buck\n")
            .commit("Initial commit");
        remote
            .write("hw/buck/buck.kicad_pcb", "(kicad_pcb)")
            .commit("Add buck board");
        Self { env }
    }

    fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("edea-repo");
        cmd.current_dir(self.env.temp.path())
            .env("REPO_CACHE_BASE", self.env.cache_root())
            .env("BOOK_CACHE_BASE", self.env.temp.path().join("books"))
            .env_remove("IS_DEV")
            .env_remove("RUST_LOG")
            .args(["--color", "never"]);
        for (key, value) in insteadof_env(&self.env.remotes()) {
            cmd.env(key, value);
        }
        cmd
    }
}

#[test]
fn test_help() {
    let mut cmd = cargo_bin_cmd!("edea-repo");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("readme"))
        .stdout(predicate::str::contains("--cache-root"));
}

#[test]
fn test_completions_bash() {
    let mut cmd = cargo_bin_cmd!("edea-repo");
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("edea-repo"));
}

#[test]
fn test_update_requires_url_or_all() {
    let mut cmd = cargo_bin_cmd!("edea-repo");
    cmd.arg("update").assert().failure();
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_list_empty_cache() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached repositories found"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_add_then_list() {
    if !git_available() {
        return;
    }
    let ws = Workspace::new();
    let url = remote_url("edea-dev", "power");

    ws.cmd()
        .args(["add", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Cloned"));

    ws.cmd()
        .args(["add", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("is already cached"));

    ws.cmd()
        .args(["add", "--strict", &url])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already"));

    ws.cmd()
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(url.as_str()))
        .stdout(predicate::str::contains("\"type\": \"git\""));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_add_invalid_url() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["add", "https://example.test/only-owner"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected host/owner/name"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_add_missing_remote() {
    if !git_available() {
        return;
    }
    let ws = Workspace::new();
    ws.cmd()
        .args(["add", &remote_url("edea-dev", "missing")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("spelled correctly"));

    assert!(!ws
        .env
        .cache_root()
        .join("example.test/edea-dev/missing")
        .exists());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_path_of_sub_module() {
    if !git_available() {
        return;
    }
    let ws = Workspace::new();
    ws.cmd()
        .args(["path", &remote_url("edea-dev", "power"), "--sub", "buck"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "example.test/edea-dev/power/hw/buck",
        ));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_readme() {
    if !git_available() {
        return;
    }
    let ws = Workspace::new();
    let url = remote_url("edea-dev", "power");

    ws.cmd()
        .args(["readme", &url])
        .assert()
        .success()
        .stdout("# Power\n");

    ws.cmd()
        .args(["readme", &url, "--sub", "buck"])
        .assert()
        .success()
        .stdout("buck\n");

    ws.cmd()
        .args(["readme", &url, "--sub", "boost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("boost"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_show_at_revision() {
    if !git_available() {
        return;
    }
    let ws = Workspace::new();
    let url = remote_url("edea-dev", "power");

    ws.cmd()
        .args(["show", &url, "hw/buck/buck.kicad_pcb"])
        .assert()
        .success()
        .stdout("(kicad_pcb)");

    ws.cmd()
        .args(["show", &url, "hw/buck/buck.kicad_pcb", "--rev", "HEAD~1"])
        .assert()
        .failure();

    ws.cmd()
        .args(["show", &url, "readme.md", "--case-sensitive"])
        .assert()
        .failure();
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_history() {
    if !git_available() {
        return;
    }
    let ws = Workspace::new();
    let url = remote_url("edea-dev", "power");

    ws.cmd()
        .args(["history", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("Add buck board"))
        .stdout(predicate::str::contains("Initial commit"));

    let output = ws
        .cmd()
        .args(["history", &url, "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let commits: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(commits.as_array().unwrap().len(), 2);
    assert_eq!(commits[0]["author"], "Test Author");
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_update_single_and_all() {
    if !git_available() {
        return;
    }
    let ws = Workspace::new();
    let url = remote_url("edea-dev", "power");
    ws.cmd().args(["add", &url]).assert().success();

    ws.cmd()
        .args(["update", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("already up to date"));

    GitFixture {
        dir: ws.env.remotes().join("edea-dev/power"),
    }
    .write("NOTES.md", "notes\n")
    .commit("Add notes");

    ws.cmd()
        .args(["update", "--all", "--pull"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] updated"));

    assert!(ws
        .env
        .cache_root()
        .join("example.test/edea-dev/power/NOTES.md")
        .is_file());
}

//! End-to-end tests for the `docs` command.
//!
//! The tools are shell scripts written by the test, so this file holds the
//! only test of its binary and no concurrent fork can keep a script busy.

#![cfg(unix)]

mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use common::prelude::*;
use predicates::prelude::*;

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_docs_with_configured_tools() {
    if !git_available() {
        return;
    }
    let env = TestEnv::new();
    env.remote("edea-dev", "power")
        .write("README.md", "# Power\n")
        .write("edea.yml", "modules:\n  buck:\n    dir: hw/buck\n")
        .write("hw/buck/book.toml", "[book]\n")
        .commit("Add book");

    let tools = fake_toolchain(&env.temp.path().join("tools"));
    let config = serde_yaml::to_string(&serde_json::json!({ "tools": tools })).unwrap();
    let workspace = assert_fs::fixture::ChildPath::new(env.temp.path());
    workspace.child("config.yml").write_str(&config).unwrap();

    let url = remote_url("edea-dev", "power");
    let cmd = || {
        let mut cmd = cargo_bin_cmd!("edea-repo");
        cmd.current_dir(env.temp.path())
            .env("REPO_CACHE_BASE", env.cache_root())
            .env("BOOK_CACHE_BASE", env.temp.path().join("books"))
            .env_remove("IS_DEV")
            .args(["--color", "never"]);
        for (key, value) in insteadof_env(&env.remotes()) {
            cmd.env(key, value);
        }
        cmd
    };

    cmd()
        .args(["docs", &url, "--sub", "buck"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Book written to"));

    workspace
        .child("books/example.test/edea-dev/power/buck/index.html")
        .assert(predicate::path::exists());

    cmd()
        .args(["docs", &url])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no book.toml"));
}

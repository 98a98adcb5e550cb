//! Integration tests for reading repository content at revisions.

mod common;

use std::fs;

use common::prelude::*;
use edea_repo::content::RepoContent;
use edea_repo::error::Error;
use pretty_assertions::assert_eq;

const MANIFEST: &str = r#"
name: power
modules:
  core:
    dir: src/core
  buck:
    dir: src/buck
    readme: BUCK.md
    doc: doc
  escape:
    dir: ../../outside
"#;

/// A cached repository with two commits: `v1` holds a root readme only,
/// HEAD adds the manifest and sub-modules.
fn power_repo(env: &TestEnv) -> RepoContent {
    let remote = env.remote("edea-dev", "power");
    remote.write("README.md", "# Power v1\n").commit("Initial commit");
    remote.tag("v1");

    remote
        .write("README.md", "# Power\n")
        .write("edea.yml", MANIFEST)
        .write("src/core/Readme.MD", "core readme\n")
        .write("src/core/core.kicad_pcb", "(kicad_pcb core)")
        .write("src/core/core.sch", "EESchema core")
        .write("src/core/nested/other.kicad_pcb", "(kicad_pcb nested)")
        .write("src/buck/BUCK.md", "buck readme\n")
        .write("src/buck/readme.md", "not the override\n")
        .write("src/buck/doc/book.toml", "[book]\ntitle = \"Buck\"\n")
        .write("src/buck/doc/src/SUMMARY.md", "# Summary\n")
        .write("logo.png", b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR".to_vec())
        .commit("Add sub-modules");

    let url = remote_url("edea-dev", "power");
    let cache = env.cache();
    cache.add(&url).unwrap();
    RepoContent::new(
        &cache.location(&url).unwrap(),
        cache.options().git_timeout,
    )
}

#[test]
fn test_readme_is_case_insensitive() {
    if !git_available() {
        return;
    }
    let env = TestEnv::new();
    let content = power_repo(&env);

    assert_eq!(content.readme("HEAD").unwrap(), "# Power\n");
    assert_eq!(content.readme("v1").unwrap(), "# Power v1\n");
    assert_eq!(content.readme("HEAD~1").unwrap(), "# Power v1\n");
}

#[test]
fn test_missing_file() {
    if !git_available() {
        return;
    }
    let env = TestEnv::new();
    let content = power_repo(&env);

    let err = content.file_at("missing.txt", false, "HEAD").unwrap_err();
    assert!(matches!(err, Error::NoFile { .. }));

    let err = content.file_at("readme.md", true, "HEAD").unwrap_err();
    assert!(matches!(err, Error::NoFile { .. }));
}

#[test]
fn test_binary_file_is_not_readable() {
    if !git_available() {
        return;
    }
    let env = TestEnv::new();
    let content = power_repo(&env);

    let err = content.file_at("logo.png", true, "HEAD").unwrap_err();
    assert!(matches!(err, Error::NoFile { .. }));
}

#[test]
fn test_unknown_revision() {
    if !git_available() {
        return;
    }
    let env = TestEnv::new();
    let content = power_repo(&env);

    let err = content.readme("no-such-branch").unwrap_err();
    assert!(matches!(err, Error::UnknownRevision { .. }));
}

#[test]
fn test_files_by_ext_only_direct_children() {
    if !git_available() {
        return;
    }
    let env = TestEnv::new();
    let content = power_repo(&env);

    let boards = content
        .files_by_ext_at("src/core", ".kicad_pcb", "HEAD")
        .unwrap();
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0].name, "core.kicad_pcb");
    assert_eq!(boards[0].content, b"(kicad_pcb core)".to_vec());

    let err = content
        .file_by_ext_at("src/buck", ".kicad_pcb", "HEAD")
        .unwrap_err();
    assert!(matches!(err, Error::NoFile { .. }));
}

#[test]
fn test_sub_module_resolution() {
    if !git_available() {
        return;
    }
    let env = TestEnv::new();
    let content = power_repo(&env);

    assert_eq!(content.sub_module("core", "HEAD").unwrap().dir, "src/core");
    assert_eq!(content.sub_module("", "HEAD").unwrap().dir, "");
    assert_eq!(content.sub_module("escape", "HEAD").unwrap().dir, "outside");

    let err = content.sub_module("unknown", "HEAD").unwrap_err();
    assert!(matches!(err, Error::NoSuchSubModule { .. }));

    // No manifest at v1: everything resolves to the repository root.
    assert_eq!(content.sub_module("", "v1").unwrap().dir, "");
}

#[test]
fn test_sub_module_readme() {
    if !git_available() {
        return;
    }
    let env = TestEnv::new();
    let content = power_repo(&env);

    assert_eq!(
        content.sub_module_readme("core", "HEAD").unwrap(),
        "core readme\n"
    );
    assert_eq!(
        content.sub_module_readme("buck", "HEAD").unwrap(),
        "buck readme\n"
    );
}

#[test]
fn test_history_filters_by_path() {
    if !git_available() {
        return;
    }
    let env = TestEnv::new();
    let content = power_repo(&env);

    let all = content.history("").unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].summary(), "Add sub-modules");
    assert_eq!(all[1].summary(), "Initial commit");
    assert_eq!(all[0].author, "Test Author");

    let core = content.history("src/core").unwrap();
    assert_eq!(core.len(), 1);
    assert_eq!(core[0].hash, content.resolve("HEAD").unwrap());

    assert!(content.history("does/not/exist").unwrap().is_empty());
}

#[test]
fn test_has_docs() {
    if !git_available() {
        return;
    }
    let env = TestEnv::new();
    let content = power_repo(&env);

    assert!(content.has_docs("buck", "HEAD").unwrap());
    assert!(!content.has_docs("core", "HEAD").unwrap());
    assert_eq!(content.docs_dir("buck", "HEAD").unwrap(), "src/buck/doc");
}

#[test]
fn test_empty_book_is_an_error() {
    if !git_available() {
        return;
    }
    let env = TestEnv::new();
    let remote = env.remote("edea-dev", "docs");
    remote
        .write("book.toml", "  \n")
        .write("README.md", "docs\n")
        .commit("Add empty book");
    let url = remote_url("edea-dev", "docs");
    let cache = env.cache();
    cache.add(&url).unwrap();

    let err = cache
        .with_content(&url, |c| c.has_docs("", "HEAD"))
        .unwrap_err();
    assert!(matches!(err, Error::EmptyBook { .. }));
}

#[test]
fn test_export_dir_keeps_layout() {
    if !git_available() {
        return;
    }
    let env = TestEnv::new();
    let content = power_repo(&env);
    let dest = TempDir::new().unwrap();

    let written = content
        .export_dir("src/buck/doc", "HEAD", dest.path())
        .unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(
        fs::read_to_string(dest.path().join("book.toml")).unwrap(),
        "[book]\ntitle = \"Buck\"\n"
    );
    assert!(dest.path().join("src/SUMMARY.md").is_file());
}

#[test]
fn test_empty_repository_has_no_manifest() {
    if !git_available() {
        return;
    }
    let env = TestEnv::new();
    GitFixture::init_bare(&env.remotes().join("edea-dev").join("empty"));
    let url = remote_url("edea-dev", "empty");
    let cache = env.cache();
    cache.add(&url).unwrap();

    let manifest = cache.with_content(&url, |c| c.manifest_at("HEAD")).unwrap();
    assert_eq!(manifest, None);
}

//! # Manifest Resolution
//!
//! A repository can hold several logical sub-modules. They are declared in an
//! `edea.yml` file at the repository root:
//!
//! ```yaml
//! name: power supplies
//! modules:
//!   buck:
//!     dir: src/buck
//!     readme: BUCK.md
//!     doc: doc
//! ```
//!
//! The manifest is never persisted; it is parsed from the blob at the
//! requested revision every time a sub-module is resolved. A repository
//! without `edea.yml` is a single implicit module rooted at the repository
//! root ("legacy" layout).
//!
//! Every directory taken from the manifest is sanitized with
//! [`crate::path::sanitize_relative`] before use, so a manifest can never
//! point outside its repository.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::path::{join_sanitized, sanitize_relative, to_git_path};

/// File name of the manifest at the repository root.
pub const MANIFEST_FILE: &str = "edea.yml";

/// Default readme name, matched case-insensitively.
pub const README_FILE: &str = "readme.md";

/// mdbook configuration file marking a documentation folder.
pub const BOOK_FILE: &str = "book.toml";

/// Top level project configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleSpec>,
}

/// One sub-module entry of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Folder holding the KiCad project files.
    #[serde(default)]
    pub dir: String,
    /// Readme file name inside `dir`. Only the base name is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    /// Folder inside `dir` holding `book.toml`. Only the base name is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl Project {
    /// Parse the content of an `edea.yml` file.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|source| Error::ManifestParse {
            hint: format!(
                "Could not parse {}, try checking if the syntax is correct",
                MANIFEST_FILE
            ),
            source,
        })
    }

    /// The entry for `sub`, or `NoSuchSubModule`.
    pub fn module(&self, sub: &str) -> Result<&ModuleSpec> {
        self.modules.get(sub).ok_or_else(|| Error::NoSuchSubModule {
            name: sub.to_string(),
        })
    }
}

/// A resolved sub-module: where it lives inside the repository and where its
/// readme and docs are.
///
/// All paths are relative to the repository root and use `/` separators, so
/// they can be matched against tree entries directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubModule {
    /// Sanitized module directory, empty for the repository root.
    pub dir: String,
    readme: Option<String>,
    doc: Option<String>,
}

impl SubModule {
    /// The implicit module spanning the whole repository.
    pub fn root() -> Self {
        Self::default()
    }

    fn from_spec(spec: &ModuleSpec) -> Self {
        // Only the last component of an override counts.
        let base_name = |value: &Option<String>| {
            value
                .as_deref()
                .and_then(|v| {
                    sanitize_relative(v)
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                })
                .filter(|v| !v.is_empty())
        };
        Self {
            dir: to_git_path(&sanitize_relative(&spec.dir)),
            readme: base_name(&spec.readme),
            doc: base_name(&spec.doc),
        }
    }

    fn within(&self, name: &str) -> String {
        if self.dir.is_empty() {
            name.to_string()
        } else if name.is_empty() {
            self.dir.clone()
        } else {
            format!("{}/{}", self.dir, name)
        }
    }

    /// Path of the readme and whether it must be matched case-sensitively.
    ///
    /// An explicit override is matched exactly, by base name, directly in the
    /// module directory; the default `readme.md` matches any capitalisation.
    pub fn readme_path(&self) -> (String, bool) {
        match &self.readme {
            Some(readme) => (self.within(readme), true),
            None => (self.within(README_FILE), false),
        }
    }

    /// Folder holding the module documentation.
    pub fn doc_dir(&self) -> String {
        self.within(self.doc.as_deref().unwrap_or_default())
    }

    /// Path of the `book.toml` of the module documentation.
    pub fn book_toml_path(&self) -> String {
        let doc_dir = self.doc_dir();
        if doc_dir.is_empty() {
            BOOK_FILE.to_string()
        } else {
            format!("{}/{}", doc_dir, BOOK_FILE)
        }
    }

    /// Absolute module directory below a checkout.
    pub fn absolute(&self, repo_root: &Path) -> PathBuf {
        join_sanitized(repo_root, &self.dir)
    }
}

/// Resolve `sub` against the manifest content.
///
/// `manifest` is `None` when the repository has no `edea.yml`; the whole
/// repository is then the module. An empty `sub` that the manifest does not
/// declare also resolves to the repository root. Any other undeclared name
/// is `NoSuchSubModule`.
pub fn resolve(manifest: Option<&str>, sub: &str) -> Result<SubModule> {
    let Some(raw) = manifest else {
        debug!(
            "no {} found, assuming project files are in the top-level dir",
            MANIFEST_FILE
        );
        return Ok(SubModule::root());
    };

    let project = Project::parse(raw)?;
    match project.module(sub) {
        Ok(spec) => Ok(SubModule::from_spec(spec)),
        Err(_) if sub.is_empty() => Ok(SubModule::root()),
        Err(e) => Err(e),
    }
}

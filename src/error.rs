//! # Error Handling
//!
//! This module defines the single error type used by every layer of the
//! repository cache: path resolution, the git backend, the persisted index,
//! manifest resolution, content access and the derived-artifact pipeline.
//!
//! ## Key Components
//!
//! - **`Error`**: The enum of all failure modes. Variants that represent a
//!   failed external tool carry a user-facing `hint` next to the raw tool
//!   `log`, so a caller can show a friendly message and still keep the full
//!   diagnostics around.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! `Error::EmptyRemoteRepository` is special: the cache treats it as a soft
//! success when cloning (an empty module repository is valid, it simply has
//! no content yet). Everywhere else it propagates like any other error.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for repository cache operations
#[derive(Error, Debug)]
pub enum Error {
    /// The URL could not be split into host, owner and repository name.
    #[error("Invalid repository URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Another URL already occupies the cache directory of this URL.
    #[error("Cache folder for {url} already exists at {}", path.display())]
    CacheConflict { url: String, path: PathBuf },

    /// The repository was already added to the cache.
    #[error("Repository already added: {url}")]
    AlreadyExists { url: String },

    /// The requested file does not exist at the given revision, or is binary.
    #[error("No file found: {name} at {revision}")]
    NoFile { name: String, revision: String },

    /// The manifest does not declare the requested sub-module.
    #[error("No such sub-module: {name}")]
    NoSuchSubModule { name: String },

    /// An operation was attempted on a repository that was never added.
    #[error("Repository not cached: {url}")]
    UncachedRepository { url: String },

    /// The remote repository exists but has no commits yet.
    #[error("Remote repository is empty: {url}")]
    EmptyRemoteRepository { url: String },

    /// A revision specifier could not be resolved to a commit.
    #[error("Unknown revision {revision}: {message}")]
    UnknownRevision { revision: String, message: String },

    /// An error occurred while cloning a Git repository.
    #[error("Git clone error for {url}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// An error occurred while executing a Git command.
    #[error("Git command failed in {}: {command} - {stderr}", path.display())]
    GitCommand {
        command: String,
        path: PathBuf,
        stderr: String,
    },

    /// A subprocess did not finish before its deadline and was killed.
    #[error("{command} timed out after {}s", timeout.as_secs_f32())]
    Timeout { command: String, timeout: Duration },

    /// A subprocess could not be started at all.
    #[error("Could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool of the artifact pipeline failed.
    ///
    /// `hint` is meant for the end user, `log` holds the combined tool output.
    #[error("{hint}: {message}")]
    Tool {
        tool: String,
        hint: String,
        message: String,
        log: String,
    },

    /// The `edea.yml` manifest could not be parsed.
    #[error("{hint}: {source}")]
    ManifestParse {
        hint: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A `book.toml` exists but has no content.
    #[error("Empty book.toml found at {path}")]
    EmptyBook { path: String },

    /// The persisted repository index could not be read or written.
    #[error("Repository index error: {message}")]
    Index { message: String },

    /// Service configuration is invalid.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A TOML parsing error, wrapped from `toml::de::Error`.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// The user-facing hint, if this error carries one.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Error::Tool { hint, .. } | Error::ManifestParse { hint, .. } => Some(hint),
            Error::GitClone { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }

    /// The raw diagnostic log of a failed tool invocation.
    pub fn log(&self) -> Option<&str> {
        match self {
            Error::Tool { log, .. } => Some(log),
            _ => None,
        }
    }

    /// Renders the error for an end user.
    ///
    /// In development mode the full error and the tool log are included.
    /// Otherwise only the hint (or the error message when there is no hint)
    /// is shown.
    pub fn user_message(&self, dev: bool) -> String {
        if !dev {
            return self
                .hint()
                .map(str::to_string)
                .unwrap_or_else(|| self.to_string());
        }
        match self.log() {
            Some(log) if !log.is_empty() => format!("{}\n\n{}", self, log),
            _ => self.to_string(),
        }
    }

    /// True for the soft-success outcome of cloning an empty repository.
    pub fn is_empty_remote(&self) -> bool {
        matches!(self, Error::EmptyRemoteRepository { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

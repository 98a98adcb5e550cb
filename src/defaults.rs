//! Default locations used when the configuration leaves them out.

use std::path::PathBuf;

fn base_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".edea-cache"))
        .join("edea")
}

/// Returns the default repository cache root.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/edea/git` (XDG Base Directory)
/// - macOS: `~/Library/Caches/edea/git`
/// - Windows: `{FOLDERID_LocalAppData}\edea\git`
///
/// Falls back to `.edea-cache/edea/git` in the current directory if the
/// platform cache directory cannot be determined.
pub fn default_cache_root() -> PathBuf {
    base_dir().join("git")
}

/// Returns the default root for rendered documentation.
pub fn default_book_root() -> PathBuf {
    base_dir().join("book")
}

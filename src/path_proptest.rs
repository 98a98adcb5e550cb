//! Property-based tests for path resolution and sanitization.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{join_sanitized, resolve, sanitize_relative, RepoUrl};
    use proptest::prelude::*;
    use std::path::{Component, Path};

    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,15}".prop_filter("not a dot segment", |s| {
            s != "." && s != ".." && s.trim_end_matches(".git") != "" && s != "-"
        })
    }

    // ============================================================================
    // resolve property tests
    // ============================================================================

    proptest! {
        /// Property: resolve is a pure function of (root, url)
        #[test]
        fn resolve_is_deterministic(owner in segment(), name in segment()) {
            let url = format!("https://github.com/{}/{}", owner, name);
            let root = Path::new("/cache");
            prop_assert_eq!(resolve(root, &url).unwrap(), resolve(root, &url).unwrap());
        }

        /// Property: a resolved path always lies below the cache root
        #[test]
        fn resolve_stays_below_root(owner in segment(), name in segment()) {
            let url = format!("git@gitlab.com:{}/{}.git", owner, name);
            let root = Path::new("/cache");
            let resolved = resolve(root, &url).unwrap();
            prop_assert!(resolved.starts_with(root));
            prop_assert!(resolved
                .strip_prefix(root)
                .unwrap()
                .components()
                .all(|c| matches!(c, Component::Normal(_))));
        }

        /// Property: https and scp forms of the same repository share a path
        #[test]
        fn url_forms_agree(owner in segment(), name in segment()) {
            let https = RepoUrl::parse(&format!("https://github.com/{}/{}", owner, name)).unwrap();
            let scp = RepoUrl::parse(&format!("git@github.com:{}/{}", owner, name)).unwrap();
            prop_assert_eq!(https.relative_path(), scp.relative_path());
        }

        /// Property: parsing arbitrary input never panics
        #[test]
        fn parse_never_panics(input in ".*") {
            let _ = RepoUrl::parse(&input);
        }
    }

    // ============================================================================
    // sanitize_relative property tests
    // ============================================================================

    proptest! {
        /// Property: sanitized manifest directories never escape their root
        #[test]
        fn sanitized_dir_never_escapes(dir in "[a-z./]{0,40}") {
            let root = Path::new("/cache/github.com/owner/repo");
            let joined = join_sanitized(root, &dir);
            prop_assert!(joined.starts_with(root), "{:?} escaped via {:?}", joined, dir);
        }

        /// Property: sanitized paths contain only normal components
        #[test]
        fn sanitized_has_only_normal_components(dir in ".*") {
            let sanitized = sanitize_relative(&dir);
            prop_assert!(sanitized.components().all(|c| matches!(c, Component::Normal(_))));
        }

        /// Property: plain relative directories pass through unchanged
        #[test]
        fn plain_dirs_are_kept(parts in prop::collection::vec("[a-z0-9_]{1,8}", 1..4)) {
            let dir = parts.join("/");
            prop_assert_eq!(sanitize_relative(&dir), Path::new(&dir).to_path_buf());
        }
    }
}

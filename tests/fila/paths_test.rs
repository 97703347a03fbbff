/*!
 * Path Algorithm Tests
 * Fixed cases plus property checks against an independent cleaner
 */

use fila::fila::paths::{is_absolute, join, normalize, relative_in, resolve_in};
use path_clean::PathClean;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::path::Path;

#[test]
fn test_normalize_cases() {
    assert_eq!(normalize(""), ".");
    assert_eq!(normalize("/"), "/");
    assert_eq!(normalize("//a//b/"), "/a/b/");
    assert_eq!(normalize("/a/b/../../.."), "/");
    assert_eq!(normalize("a/../../b"), "../b");
    assert_eq!(normalize("./a/./b"), "a/b");
    assert_eq!(normalize("a/.."), ".");
}

#[test]
fn test_join_cases() {
    assert_eq!(join(&["/foo", "bar", "baz/asdf", "quux", ".."]), "/foo/bar/baz/asdf");
    assert_eq!(join::<&str>(&[]), ".");
    assert_eq!(join(&["", ""]), ".");
    assert_eq!(join(&["a", "", "b"]), "a/b");
}

#[test]
fn test_resolve_cases() {
    assert_eq!(resolve_in("/cwd", &["/foo/bar", "./baz"]), "/foo/bar/baz");
    assert_eq!(resolve_in("/cwd", &["/foo/bar", "/tmp/file/"]), "/tmp/file");
    assert_eq!(resolve_in("/cwd", &["wwwroot", "static_files/png/", "../gif/image.gif"]),
        "/cwd/wwwroot/static_files/gif/image.gif");
    assert_eq!(resolve_in("/cwd", &[""]), "/cwd");
    assert_eq!(resolve_in("/", &[".."]), "/");
}

#[test]
fn test_relative_cases() {
    assert_eq!(relative_in("/", "/data/orandea/test/aaa", "/data/orandea/impl/bbb"), "../../impl/bbb");
    assert_eq!(relative_in("/", "/a/b", "/a/b/c/d"), "c/d");
    assert_eq!(relative_in("/", "/a/b/c", "/a"), "../..");
    assert_eq!(relative_in("/", "/", "/a"), "a");
    assert_eq!(relative_in("/", "/a", "/"), "..");
    assert_eq!(relative_in("/", "/a/b", "/a/b"), "");
    assert_eq!(relative_in("/home", "x", "/home/x/y"), "y");
}

#[test]
fn test_is_absolute() {
    assert!(is_absolute("/a"));
    assert!(!is_absolute("a/b"));
    assert!(!is_absolute(""));
}

fn segment() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["a", "b", "dir", "file.txt", ".", "..", ""])
}

fn absolute_path() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 0..8).prop_map(|segments| format!("/{}", segments.join("/")))
}

proptest! {
    #[test]
    fn prop_normalize_agrees_with_path_clean(path in absolute_path()) {
        prop_assume!(!path.ends_with('/') || path == "/");
        let expected = Path::new(&path).to_path_buf().clean();
        prop_assert_eq!(normalize(&path), expected.to_string_lossy().into_owned());
    }

    #[test]
    fn prop_normalize_is_idempotent(path in absolute_path()) {
        let once = normalize(&path);
        prop_assert_eq!(normalize(&once), once.clone());
    }

    #[test]
    fn prop_resolve_is_absolute(segments in prop::collection::vec(segment(), 0..6)) {
        let resolved = resolve_in("/base/dir", &segments);
        prop_assert!(is_absolute(&resolved));
        prop_assert!(!resolved.contains("/./"));
        prop_assert!(!resolved.contains("/../"));
    }

    #[test]
    fn prop_relative_resolves_back(from in absolute_path(), to in absolute_path()) {
        let rel = relative_in("/", &from, &to);
        let back = resolve_in("/", &[from.as_str(), rel.as_str()]);
        prop_assert_eq!(back, resolve_in("/", &[to.as_str()]));
    }
}

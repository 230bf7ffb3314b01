// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use rstest::rstest;
use tempfile::TempDir;

use super::*;

const ITEMS: [&str; 3] = ["one", "two", "three"];

fn starts_with(prefix: &'static str) -> Filter<&'static str> {
    Filter::new(move |s: &&str| s.starts_with(prefix))
}

fn ends_with(suffix: &'static str) -> Filter<&'static str> {
    Filter::new(move |s: &&str| s.ends_with(suffix))
}

#[rstest]
fn test_single_filter() {
    let filter = Filter::new(|s: &&str| *s == "one");
    let items: Vec<_> = filter.apply(ITEMS).collect();
    assert_eq!(items, vec!["one"]);
}

#[rstest]
fn test_or_is_union() {
    let filter = starts_with("o").or(ends_with("e"));
    let items: Vec<_> = filter.apply(ITEMS).collect();
    assert_eq!(items, vec!["one", "three"]);
}

#[rstest]
fn test_filters_compose() {
    let filter = starts_with("o").or(ends_with("e")).and(starts_with("t"));
    let items: Vec<_> = filter.apply(ITEMS).collect();
    assert_eq!(items, vec!["three"]);
}

#[rstest]
fn test_not_is_complement() {
    let filter = !Filter::new(|s: &&str| *s == "one");
    let items: Vec<_> = filter.apply(ITEMS).collect();
    assert_eq!(items, vec!["two", "three"]);

    assert!(starts_with("t").negate().matches(&"one"));
}

#[rstest]
fn test_all_and_any() {
    let all = Filter::all([starts_with("t"), ends_with("o")]);
    assert_eq!(all.apply(ITEMS).collect::<Vec<_>>(), vec!["two"]);

    let any = Filter::any([starts_with("tw"), ends_with("ne")]);
    assert_eq!(any.apply(ITEMS).collect::<Vec<_>>(), vec!["one", "two"]);

    assert_eq!(Filter::<&str>::all([]).apply(ITEMS).count(), 3);
    assert_eq!(Filter::<&str>::any([]).apply(ITEMS).count(), 0);
}

#[rstest]
fn test_apply_is_lazy() {
    let filter = starts_with("t");
    let mut items = filter.apply(ITEMS.into_iter().chain(std::iter::repeat("tail")));
    assert_eq!(items.next(), Some("two"));
    assert_eq!(items.next(), Some("three"));
    assert_eq!(items.next(), Some("tail"));
}

#[rstest]
#[case(&["*.txt"], 5)]
#[case(&["*.txt", "*.bin"], 7)]
#[case(&["file.bin"], 2)]
#[case(&["*.none"], 0)]
fn test_filename_matches(#[case] patterns: &[&str], #[case] expected: usize) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    std::fs::create_dir_all(root.join("a/b/c/d/e")).unwrap();
    for file in [
        "a/b/c/d/e/file.txt",
        "a/b/c/d/file.txt",
        "a/b/c/d/file.bin",
        "a/b/c/file.txt",
        "a/b/c/file.bin",
        "a/b/file.txt",
        "a/CMakeLists.txt",
        "a/conanfile.py",
    ] {
        std::fs::write(root.join(file), "").unwrap();
    }

    let files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.unwrap().into_path())
        .collect();
    let filter = filename_matches(patterns).unwrap().and(is_file());
    let count = files.iter().filter(|p| filter.matches(p)).count();
    assert_eq!(count, expected);
}

#[rstest]
fn test_filename_matches_uses_base_name() {
    let filter = filename_matches(["*test*"]).unwrap();
    assert!(filter.matches(Path::new("/tmp/build/unit-tests")));
    assert!(!filter.matches(Path::new("/test/dir/build-script")));
}

#[rstest]
fn test_invalid_pattern() {
    match filename_matches(["[unclosed"]) {
        Err(Error::InvalidPattern { pattern, .. }) => assert_eq!(pattern, "[unclosed"),
        Err(other) => panic!("Expected InvalidPattern, got: {:?}", other),
        Ok(_) => panic!("Expected InvalidPattern, got a filter"),
    }
}

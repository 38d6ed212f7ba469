//! # File Collector Unit Tests / 文件收集器单元测试
//!
//! Glob expansion against real directory trees, and the `grep` file filter.
//!
//! 针对真实目录树的 glob 展开，以及 `grep` 文件过滤器。

mod common;

use std::path::PathBuf;

use common::{create_tree, relative_paths};
use suite_runner::core::error::Error;
use suite_runner::core::files::FileCollector;
use suite_runner::core::models::TestFiles;

fn sample_tree() -> tempfile::TempDir {
    create_tree(&[
        ("tests/unit/users/create.spec.ts", ""),
        ("tests/unit/users/edit.spec.ts", ""),
        ("tests/unit/math.spec.ts", ""),
        ("tests/functional/users.spec.ts", ""),
        ("tests/functional/helpers.ts", ""),
        ("node_modules/pkg/index.spec.ts", ""),
        ("README.md", ""),
    ])
}

fn collector() -> FileCollector {
    FileCollector::new(vec!["node_modules/**".to_string()])
}

#[tokio::test]
async fn globs_return_sorted_absolute_files() {
    let tree = sample_tree();
    let files = collector()
        .get_files(tree.path(), &TestFiles::glob("tests/**/*.spec.ts"))
        .await
        .unwrap();

    assert!(files.iter().all(|file| file.is_absolute() && file.is_file()));
    assert_eq!(
        relative_paths(tree.path(), &files),
        vec![
            "tests/functional/users.spec.ts",
            "tests/unit/math.spec.ts",
            "tests/unit/users/create.spec.ts",
            "tests/unit/users/edit.spec.ts",
        ]
    );
}

#[tokio::test]
async fn directories_are_never_returned() {
    let tree = sample_tree();
    let files = collector()
        .get_files(tree.path(), &TestFiles::glob("tests/*"))
        .await
        .unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn duplicates_across_patterns_keep_first_position() {
    let tree = sample_tree();
    let files = collector()
        .get_files(
            tree.path(),
            &TestFiles::globs(["tests/unit/math.spec.ts", "./tests/unit/*.spec.ts", "*.md"]),
        )
        .await
        .unwrap();
    assert_eq!(
        relative_paths(tree.path(), &files),
        vec!["tests/unit/math.spec.ts", "README.md"]
    );
}

#[tokio::test]
async fn excluded_directories_are_skipped() {
    let tree = sample_tree();
    let files = collector()
        .get_files(tree.path(), &TestFiles::glob("**/*.spec.ts"))
        .await
        .unwrap();
    assert!(
        relative_paths(tree.path(), &files)
            .iter()
            .all(|file| !file.starts_with("node_modules"))
    );
    assert_eq!(files.len(), 4);
}

#[tokio::test]
async fn missing_glob_root_yields_no_files() {
    let tree = sample_tree();
    let files = collector()
        .get_files(tree.path(), &TestFiles::glob("missing/**/*.ts"))
        .await
        .unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn invalid_glob_is_an_error() {
    let tree = sample_tree();
    let error = collector()
        .get_files(tree.path(), &TestFiles::glob("tests/[unclosed"))
        .await
        .unwrap_err();
    assert!(matches!(error, Error::InvalidGlob { ref pattern, .. } if pattern == "tests/[unclosed"));
}

#[tokio::test]
async fn callback_results_are_adopted_verbatim() {
    let files = TestFiles::callback(|| async {
        Ok(vec![PathBuf::from("/virtual/b.ts"), PathBuf::from("/virtual/a.ts")])
    });
    let collected = collector()
        .get_files(&PathBuf::from("/"), &files)
        .await
        .unwrap();
    assert_eq!(
        collected,
        vec![PathBuf::from("/virtual/b.ts"), PathBuf::from("/virtual/a.ts")]
    );
}

#[tokio::test]
async fn callback_errors_are_reported() {
    let files = TestFiles::callback(|| async { Err(anyhow::anyhow!("no files today")) });
    let error = collector()
        .get_files(&PathBuf::from("/"), &files)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::FilesCallback(_)));
}

#[tokio::test]
async fn grep_with_empty_filters_is_a_no_op() {
    let tree = sample_tree();
    let collector = collector();
    let files = collector
        .get_files(tree.path(), &TestFiles::glob("tests/**/*.spec.ts"))
        .await
        .unwrap();
    assert_eq!(collector.grep(files.clone(), &[]), files);
}

#[test]
fn grep_wildcard_selects_directory_contents() {
    let files: Vec<PathBuf> = [
        "tests/unit/users/create.spec.ts",
        "tests/unit/users/edit.spec.ts",
        "tests/functional/users.spec.ts",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();

    let kept = collector().grep(files.clone(), &["unit/users/*".to_string()]);
    assert_eq!(kept, files[..2].to_vec());
}

#[test]
fn grep_keeps_files_matching_any_filter() {
    let files: Vec<PathBuf> = ["/p/tests/a.spec.ts", "/p/tests/b.spec.ts", "/p/tests/c.spec.ts"]
        .iter()
        .map(PathBuf::from)
        .collect();

    let kept = collector().grep(files, &["tests/a".to_string(), "c".to_string()]);
    assert_eq!(
        kept,
        vec![PathBuf::from("/p/tests/a.spec.ts"), PathBuf::from("/p/tests/c.spec.ts")]
    );
}

//! # File Collection Module / 文件收集模块
//!
//! Resolves a suite's `TestFiles` into concrete file paths and narrows them
//! down with the `--files` filter.
//!
//! 将套件的 `TestFiles` 解析为具体的文件路径，并使用 `--files` 过滤器进一步筛选。

use std::path::{Path, PathBuf};

use crate::core::error::{Error, Result};
use crate::core::models::TestFiles;
use crate::infra::fs;

const TEST_MARKERS: &[&str] = &[".spec", ".test"];

/// Collects and filters test files.
/// 收集并过滤测试文件。
#[derive(Debug, Clone, Default)]
pub struct FileCollector {
    exclude: Vec<String>,
}

impl FileCollector {
    /// Creates a collector skipping files matched by the `exclude` globs.
    pub fn new(exclude: Vec<String>) -> Self {
        Self { exclude }
    }

    /// Returns the files of a suite. Callback results are adopted verbatim;
    /// glob patterns are expanded below `cwd` into absolute file paths.
    ///
    /// 返回套件的文件。回调结果按原样采用；
    /// glob 模式在 `cwd` 下展开为绝对文件路径。
    pub async fn get_files(&self, cwd: &Path, files: &TestFiles) -> Result<Vec<PathBuf>> {
        let collected = match files {
            TestFiles::Callback(callback) => callback()
                .await
                .map_err(|source| Error::FilesCallback(source.into()))?,
            TestFiles::Globs(patterns) => fs::expand_globs(cwd, patterns, &self.exclude).await?,
        };
        tracing::debug!(count = collected.len(), cwd = %cwd.display(), "collected test files");
        Ok(collected)
    }

    /// Keeps the files matching at least one filter. Empty filters keep every file.
    ///
    /// A file matches a filter when its path ends with the filter, or when
    /// every `/` separated filter segment, compared from the end, is `*` or a
    /// suffix of the corresponding path segment. Path segments are taken
    /// from the path with its extension and `.spec`/`.test` marker removed;
    /// the file name segment is also compared in full.
    ///
    /// 保留至少匹配一个过滤器的文件。过滤器为空时保留所有文件。
    pub fn grep(&self, files: Vec<PathBuf>, filters: &[String]) -> Vec<PathBuf> {
        if filters.is_empty() {
            return files;
        }
        files
            .into_iter()
            .filter(|file| {
                let normalized = normalize_path(file);
                filters
                    .iter()
                    .any(|filter| matches_filter(&normalized, filter))
            })
            .collect()
    }
}

/// Path as a string with forward slashes.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Removes the extension and an optional `.spec`/`.test` marker from the
/// last segment of `path`.
pub fn strip_test_suffix(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |index| index + 1);
    let Some(dot) = path[name_start..].rfind('.').map(|index| name_start + index) else {
        return path;
    };
    let extension = &path[dot + 1..];
    if dot == name_start || extension.is_empty() || !extension.chars().all(char::is_alphanumeric) {
        return path;
    }

    let stem = &path[..dot];
    TEST_MARKERS
        .iter()
        .find_map(|marker| stem.strip_suffix(marker))
        .unwrap_or(stem)
}

fn matches_filter(normalized: &str, filter: &str) -> bool {
    if normalized.ends_with(filter) {
        return true;
    }

    let raw_name = normalized.rsplit('/').next().unwrap_or_default();
    let mut file_segments = strip_test_suffix(normalized).rsplit('/');

    filter.rsplit('/').enumerate().all(|(index, segment)| {
        let Some(file_segment) = file_segments.next().filter(|s| !s.is_empty()) else {
            return false;
        };
        segment == "*"
            || file_segment.ends_with(segment)
            || (index == 0 && raw_name.ends_with(segment))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(files: &[&str]) -> Vec<PathBuf> {
        files.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn strips_extension_and_marker() {
        assert_eq!(strip_test_suffix("/a/create.spec.ts"), "/a/create");
        assert_eq!(strip_test_suffix("/a/create.test.sh"), "/a/create");
        assert_eq!(strip_test_suffix("/a/create.sh"), "/a/create");
        assert_eq!(strip_test_suffix("/a.b/create"), "/a.b/create");
        assert_eq!(strip_test_suffix("/a/.hidden"), "/a/.hidden");
    }

    #[test]
    fn wildcard_segment_matches_directory_contents() {
        let files = paths(&[
            "/p/tests/unit/users/create.spec.ts",
            "/p/tests/unit/users/edit.spec.ts",
            "/p/tests/functional/users.spec.ts",
        ]);
        let kept = FileCollector::default().grep(files.clone(), &["unit/users/*".to_string()]);
        assert_eq!(kept, files[..2].to_vec());
    }

    #[test]
    fn segment_suffix_matches_file_name() {
        let files = paths(&["/p/tests/unit/create_user.spec.ts", "/p/tests/unit/post.spec.ts"]);
        let kept = FileCollector::default().grep(files, &["unit/user".to_string()]);
        assert_eq!(kept, paths(&["/p/tests/unit/create_user.spec.ts"]));
    }

    #[test]
    fn raw_path_suffix_matches() {
        let files = paths(&["/p/tests/a.spec.ts", "/p/tests/b.spec.ts"]);
        let kept = FileCollector::default().grep(files, &["b.spec.ts".to_string()]);
        assert_eq!(kept, paths(&["/p/tests/b.spec.ts"]));
    }

    #[test]
    fn filters_longer_than_the_path_do_not_match() {
        let files = paths(&["/a.sh"]);
        let kept = FileCollector::default().grep(files, &["x/y/a".to_string()]);
        assert!(kept.is_empty());
    }

    #[test]
    fn empty_filters_keep_everything() {
        let files = paths(&["/b", "/a"]);
        assert_eq!(FileCollector::default().grep(files.clone(), &[]), files);
    }
}

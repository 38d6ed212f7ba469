//! # File System Operations Module / 文件系统操作模块
//!
//! Expands glob patterns into the files they match below a working
//! directory. The directory walk is blocking and runs on tokio's blocking pool.
//!
//! 将 glob 模式展开为工作目录下匹配的文件。
//! 目录遍历是阻塞操作，在 tokio 的阻塞线程池中运行。

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::core::error::{Error, Result};

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Returns the absolute paths of the files matched by `patterns`, relative to
/// `cwd`. Matches are sorted within each pattern; a file matched by several
/// patterns keeps its first position. Directories are never returned.
///
/// 返回相对于 `cwd` 由 `patterns` 匹配到的文件的绝对路径。
/// 每个模式内的结果已排序；被多个模式匹配的文件保留其首次出现的位置。
/// 从不返回目录。
pub async fn expand_globs(
    cwd: &Path,
    patterns: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>> {
    let cwd = cwd.to_path_buf();
    let patterns = patterns.to_vec();
    let exclude = exclude.to_vec();
    tokio::task::spawn_blocking(move || expand_globs_blocking(&cwd, &patterns, &exclude))
        .await
        .map_err(Error::CollectorTask)?
}

/// Blocking variant of [`expand_globs`].
pub fn expand_globs_blocking(
    cwd: &Path,
    patterns: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>> {
    let excluded = build_exclude_set(exclude)?;
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        for file in expand_pattern(cwd, pattern, &excluded)? {
            if seen.insert(file.clone()) {
                files.push(file);
            }
        }
    }
    Ok(files)
}

fn build_exclude_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(trim_dot_slash(pattern)).map_err(|source| Error::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| Error::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| Error::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })
}

fn expand_pattern(cwd: &Path, pattern: &str, excluded: &GlobSet) -> Result<Vec<PathBuf>> {
    let pattern = trim_dot_slash(pattern);
    let absolute = Path::new(pattern).is_absolute();
    let matcher = compile(pattern)?;

    let root = cwd.join(literal_prefix(pattern));
    if !root.exists() {
        tracing::debug!(pattern, root = %root.display(), "glob root does not exist");
        return Ok(Vec::new());
    }

    let relative_to_cwd = |path: &Path| path.strip_prefix(cwd).ok().map(to_slash);
    let is_excluded = |path: &Path, is_dir: bool| match relative_to_cwd(path) {
        Some(rel) if rel.is_empty() => false,
        Some(rel) if is_dir => excluded.is_match(&rel) || excluded.is_match(format!("{rel}/")),
        Some(rel) => excluded.is_match(&rel),
        None => false,
    };

    let walker = WalkDir::new(&root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && is_excluded(entry.path(), true)));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| Error::FileCollection {
            path: root.clone(),
            source,
        })?;
        if !entry.file_type().is_file() || is_excluded(entry.path(), false) {
            continue;
        }

        let candidate = if absolute {
            Some(to_slash(entry.path()))
        } else {
            relative_to_cwd(entry.path())
        };
        if candidate.is_some_and(|candidate| matcher.is_match(candidate)) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// The leading components of `pattern` that contain no glob syntax.
fn literal_prefix(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .take_while(|component| match component {
            Component::Normal(part) => !part.to_string_lossy().contains(GLOB_META),
            _ => true,
        })
        .collect()
}

fn trim_dot_slash(pattern: &str) -> &str {
    let mut pattern = pattern;
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest;
    }
    pattern
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::RootDir => Some(String::new()),
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

// Shared test helpers for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use suite_runner::core::config::{NormalizedConfig, RawConfig};
use suite_runner::core::merger::ConfigMerger;
use suite_runner::core::models::CliArgs;
use suite_runner::cli::CliParser;
use tempfile::{TempDir, tempdir};

/// Creates a temporary directory containing `files`, given as relative
/// paths and contents.
pub fn create_tree(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    for (path, content) in files {
        write_file(temp_dir.path(), path, content);
    }
    temp_dir
}

pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, content).expect("Failed to write file");
    path
}

/// Writes an executable shell script.
#[cfg(unix)]
pub fn write_script(root: &Path, relative: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = write_file(root, relative, &format!("#!/bin/sh\n{body}\n"));
    let mut permissions = fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).unwrap();
    path
}

/// Parses command-line arguments, panicking on invalid input.
pub fn cli(args: &[&str]) -> CliArgs {
    CliParser::new(args.iter().copied())
        .parse()
        .expect("arguments should parse")
}

pub fn hydrate(config: RawConfig, args: &[&str]) -> NormalizedConfig {
    ConfigMerger::new(config, cli(args)).hydrate()
}

pub fn relative_paths(root: &Path, files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|file| {
            file.strip_prefix(root)
                .expect("file should be under root")
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

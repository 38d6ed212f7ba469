//! Persistent list of the test titles that failed in the previous run.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default file name of the cache inside the system temp directory.
pub const DEFAULT_CACHE_FILE: &str = "suite-runner-failed-tests.json";

#[derive(Debug, Serialize, Deserialize)]
struct CacheContent {
    updated_at: DateTime<Utc>,
    tests: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FailedTestsCache {
    path: PathBuf,
}

impl Default for FailedTestsCache {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join(DEFAULT_CACHE_FILE))
    }
}

impl FailedTestsCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored titles; a missing cache file yields an empty list.
    pub fn load(&self) -> anyhow::Result<Vec<String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read failed tests cache: {}", self.path.display())
                });
            }
        };
        let cache: CacheContent = serde_json::from_str(&content).with_context(|| {
            format!("Failed to parse failed tests cache: {}", self.path.display())
        })?;
        Ok(cache.tests)
    }

    pub fn store(&self, titles: &[String]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = CacheContent {
            updated_at: Utc::now(),
            tests: titles.to_vec(),
        };
        let json = serde_json::to_string_pretty(&content)?;
        std::fs::write(&self.path, json).with_context(|| {
            format!("Failed to write failed tests cache: {}", self.path.display())
        })
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e).with_context(|| {
                format!("Failed to remove failed tests cache: {}", self.path.display())
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn store_load_and_clear() {
        let dir = tempdir().unwrap();
        let cache = FailedTestsCache::new(dir.path().join("nested/cache.json"));

        assert!(cache.load().unwrap().is_empty());

        cache.store(&["a".to_string(), "b, c".to_string()]).unwrap();
        assert_eq!(cache.load().unwrap(), vec!["a", "b, c"]);

        cache.clear().unwrap();
        assert!(cache.load().unwrap().is_empty());
        cache.clear().unwrap();
    }
}

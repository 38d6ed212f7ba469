//! # Plugins Module / 插件模块
//!
//! Plugins are ordered transformations of the normalized config, applied
//! before planning. The built-in `failed_tests_plugin` backs `--failed`.
//!
//! 插件是在规划之前按顺序应用于规范化配置的转换。
//! 内置的 `failed_tests_plugin` 用于支持 `--failed`。

use std::sync::Arc;

use crate::core::config::NormalizedConfig;
use crate::core::error::{Error, Result};
use crate::core::hooks::hook;
use crate::core::models::{CliArgs, Filters};
use crate::infra::cache::FailedTestsCache;

pub type PluginFn =
    Arc<dyn Fn(NormalizedConfig, &CliArgs) -> anyhow::Result<NormalizedConfig> + Send + Sync>;

/// Applies the config's plugins in order, feeding each one the previous output.
pub fn apply_plugins(config: NormalizedConfig, cli: &CliArgs) -> Result<NormalizedConfig> {
    let plugins = config.plugins.clone();
    plugins.iter().try_fold(config, |config, plugin| {
        plugin(config, cli).map_err(|source| Error::Plugin(source.into()))
    })
}

/// Re-runs the tests that failed last time when `--failed` is passed, and
/// records the failures of every run.
///
/// 传入 `--failed` 时重新运行上次失败的测试，并记录每次运行的失败测试。
pub fn failed_tests_plugin(cache: FailedTestsCache) -> PluginFn {
    Arc::new(move |mut config, cli| {
        if cli.failed && Filters::active(&config.filters.tests).is_none() {
            let titles = cache.load()?;
            if titles.is_empty() {
                tracing::debug!(cache = %cache.path().display(), "no failed tests recorded");
            } else {
                tracing::debug!(count = titles.len(), "narrowing run to previously failed tests");
                config.filters.tests = Some(titles);
            }
        }

        let cache = cache.clone();
        config.teardown.push(hook(move |state| {
            let cache = cache.clone();
            async move {
                let failed = state
                    .summary
                    .map(|summary| summary.failed_tests_titles)
                    .unwrap_or_default();
                if failed.is_empty() {
                    cache.clear()
                } else {
                    cache.store(&failed)
                }
            }
        }));
        Ok(config)
    })
}

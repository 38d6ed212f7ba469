//! # Config Merger Module / 配置合并模块
//!
//! Merges built-in defaults, the user config and the command line into a
//! `NormalizedConfig`. Command-line values take precedence over the user
//! config, which takes precedence over the defaults. Merging never fails:
//! non-numeric `--timeout`/`--retries` values are ignored.
//!
//! 将内置默认值、用户配置和命令行合并为 `NormalizedConfig`。
//! 命令行值优先于用户配置，用户配置优先于默认值。
//! 合并永远不会失败：非数字的 `--timeout`/`--retries` 值会被忽略。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{
    NormalizedConfig, RawConfig, Reporters, ReportersConfig, ResolvedTests, TestsConfig,
};
use crate::core::importer::CommandImporter;
use crate::core::models::{ArgValue, CliArgs, Filters, ResolvedSuite};
use crate::reporting::{self, DEFAULT_REPORTER};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_RETRIES: u32 = 0;
pub const DEFAULT_EXCLUDE: &[&str] = &[".git/**", "target/**", "node_modules/**"];

/// Merges a raw config with the parsed command line.
/// 将原始配置与解析后的命令行合并。
pub struct ConfigMerger {
    config: RawConfig,
    cli: CliArgs,
}

impl ConfigMerger {
    pub fn new(config: RawConfig, cli: CliArgs) -> Self {
        Self { config, cli }
    }

    pub fn hydrate(self) -> NormalizedConfig {
        let cli_filters = self.cli_filters();
        let cli_timeout = parse_number(self.cli.timeout.as_deref()).map(Duration::from_millis);
        let cli_retries =
            parse_number(self.cli.retries.as_deref()).and_then(|value| u32::try_from(value).ok());
        let cli_reporters = self
            .cli
            .reporters
            .as_ref()
            .and_then(|value| process_as_array(value, true));

        tracing::debug!(filters = ?cli_filters, "filters applied using CLI flags");

        let ConfigMerger { config, cli } = self;

        let timeout = cli_timeout.or(config.timeout).unwrap_or(DEFAULT_TIMEOUT);
        let retries = cli_retries.or(config.retries).unwrap_or(DEFAULT_RETRIES);

        let mut reporters = match config.reporters {
            None => Reporters {
                activated: vec![DEFAULT_REPORTER.to_string()],
                list: reporting::builtin_reporters(),
            },
            Some(ReportersConfig { activated, list }) => Reporters {
                activated: activated.unwrap_or_default(),
                list: list.unwrap_or_else(reporting::builtin_reporters),
            },
        };
        if let Some(activated) = cli_reporters {
            reporters.activated = activated;
        }

        let tests = match config.tests {
            TestsConfig::Files(files) => ResolvedTests::Files(files),
            TestsConfig::Suites(suites) => ResolvedTests::Suites(
                suites
                    .into_iter()
                    .map(|suite| ResolvedSuite {
                        name: suite.name,
                        files: suite.files,
                        timeout: cli_timeout.or(suite.timeout).unwrap_or(timeout),
                        retries: cli_retries.or(suite.retries).unwrap_or(retries),
                        configure: suite.configure,
                    })
                    .collect(),
            ),
        };

        NormalizedConfig {
            cwd: resolve_cwd(config.cwd),
            tests,
            timeout,
            retries,
            filters: merge_filters(config.filters, cli_filters),
            reporters,
            plugins: config.plugins.unwrap_or_default(),
            setup: config.setup.unwrap_or_default(),
            teardown: config.teardown.unwrap_or_default(),
            importer: config
                .importer
                .unwrap_or_else(|| Arc::new(CommandImporter::default())),
            refiner: config.refiner.unwrap_or_default(),
            force_exit: cli.force_exit || config.force_exit.unwrap_or(false),
            configure_suite: config.configure_suite,
            exclude: config
                .exclude
                .unwrap_or_else(|| DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect()),
            match_all_tags: cli.match_all,
        }
    }

    /// Filters given on the command line. Tags already include the negated
    /// `--ignore-tags` values.
    fn cli_filters(&self) -> Filters {
        let cli = &self.cli;

        let mut tags = Vec::new();
        if let Some(values) = cli.tags.as_ref().and_then(|v| process_as_array(v, true)) {
            tags.extend(values);
        }
        if let Some(values) = cli
            .ignore_tags
            .as_ref()
            .and_then(|v| process_as_array(v, true))
        {
            tags.extend(values.into_iter().map(|tag| format!("!{tag}")));
        }

        // Every positional token may itself be a comma separated list.
        let suites = process_as_array(&ArgValue::One(cli.positional.join(",")), true);

        Filters {
            tests: cli.tests.as_ref().and_then(|v| process_as_array(v, false)),
            groups: cli.groups.as_ref().and_then(|v| process_as_array(v, false)),
            tags: (!tags.is_empty()).then_some(tags),
            files: cli.files.as_ref().and_then(|v| process_as_array(v, true)),
            suites,
        }
    }
}

/// Combines user and command-line filters. Tags are appended; every other
/// filter given on the command line replaces the user value.
fn merge_filters(user: Filters, cli: Filters) -> Filters {
    let tags = match (user.tags, cli.tags) {
        (Some(mut user_tags), Some(cli_tags)) => {
            user_tags.extend(cli_tags);
            Some(user_tags)
        }
        (user_tags, cli_tags) => cli_tags.or(user_tags),
    };

    Filters {
        tests: cli.tests.or(user.tests),
        groups: cli.groups.or(user.groups),
        tags,
        files: cli.files.or(user.files),
        suites: cli.suites.or(user.suites),
    }
}

/// Converts a flag value to a list. Single values are split on commas when
/// `split_by_comma` is set; repeated values are used as given. Items are
/// trimmed and empty ones dropped; an empty result counts as absent.
///
/// 将标志值转换为列表。设置 `split_by_comma` 时单个值按逗号拆分；
/// 重复的值按原样使用。各项会被去除首尾空白，空项被丢弃；结果为空时视为缺失。
pub fn process_as_array(value: &ArgValue, split_by_comma: bool) -> Option<Vec<String>> {
    let items: Vec<String> = match value {
        ArgValue::One(value) if split_by_comma => value.split(',').map(str::to_string).collect(),
        ArgValue::One(value) => vec![value.clone()],
        ArgValue::Many(values) => values.clone(),
    };

    let items: Vec<String> = items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();
    (!items.is_empty()).then_some(items)
}

/// Accepts integers as well as decimal and exponent forms such as `1.5e3`.
/// Fractions are rounded; negative and non-finite values are ignored.
fn parse_number(value: Option<&str>) -> Option<u64> {
    let value = value?.trim();
    if let Ok(number) = value.parse::<u64>() {
        return Some(number);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite() && *number >= 0.0)
        .map(|number| number.round() as u64)
}

fn resolve_cwd(cwd: Option<PathBuf>) -> PathBuf {
    let process_cwd = std::env::current_dir().unwrap_or_default();
    match cwd {
        Some(cwd) if cwd.is_absolute() => cwd,
        Some(cwd) => process_cwd.join(cwd),
        None => process_cwd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_values_split_on_commas_only_when_asked() {
        let value = ArgValue::One("a, b,,c".to_string());
        assert_eq!(
            process_as_array(&value, true),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(
            process_as_array(&value, false),
            Some(vec!["a, b,,c".to_string()])
        );
    }

    #[test]
    fn repeated_values_are_kept_verbatim_without_splitting() {
        let value = ArgValue::Many(vec!["x,y".to_string(), "z".to_string()]);
        assert_eq!(
            process_as_array(&value, true),
            Some(vec!["x,y".to_string(), "z".to_string()])
        );
        assert_eq!(process_as_array(&ArgValue::One(" ".to_string()), true), None);
    }

    #[test]
    fn numbers_accept_decimal_and_exponent_forms() {
        assert_eq!(parse_number(Some(" 3000 ")), Some(3000));
        assert_eq!(parse_number(Some("1.5e3")), Some(1500));
        assert_eq!(parse_number(Some("2.6")), Some(3));
        assert_eq!(parse_number(Some("3s")), None);
        assert_eq!(parse_number(Some("-1")), None);
        assert_eq!(parse_number(Some("NaN")), None);
        assert_eq!(parse_number(Some("inf")), None);
        assert_eq!(parse_number(Some("")), None);
        assert_eq!(parse_number(None), None);
    }
}

//! # Data Models Module / 数据模型模块
//!
//! This module defines the data structures shared by the merger, the planner
//! and the execution glue: parsed command-line arguments, filters, test file
//! specifications, resolved suites and the final execution plan.
//!
//! 此模块定义了合并器、规划器和执行流程共享的数据结构：
//! 解析后的命令行参数、过滤器、测试文件规格、解析后的套件以及最终的执行计划。

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::core::config::NormalizedConfig;
use crate::core::engine::Suite;
use crate::reporting::NamedReporter;

/// A string flag given once (`One`) or repeated on the command line (`Many`).
/// The distinction is kept so the merge stage can decide whether to split on commas.
///
/// 在命令行中出现一次（`One`）或重复出现（`Many`）的字符串标志。
/// 保留这一区别，以便合并阶段决定是否按逗号拆分。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    One(String),
    Many(Vec<String>),
}

impl ArgValue {
    /// Builds a value from every occurrence of a flag, preserving single values.
    pub fn from_occurrences(mut values: Vec<String>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(ArgValue::One),
            _ => Some(ArgValue::Many(values)),
        }
    }

    /// The last value given, which wins for scalar flags such as `--timeout`.
    pub fn last(&self) -> &str {
        match self {
            ArgValue::One(value) => value,
            ArgValue::Many(values) => values.last().map(String::as_str).unwrap_or_default(),
        }
    }
}

/// Value of an unrecognized flag passed through for plugins.
/// 透传给插件的未识别标志的值。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Bool(bool),
    One(String),
    Many(Vec<String>),
}

/// Normalized command-line arguments. Comma separated values are not split here.
///
/// 规范化后的命令行参数。逗号分隔的值不会在这里拆分。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub tests: Option<ArgValue>,
    pub groups: Option<ArgValue>,
    pub tags: Option<ArgValue>,
    /// Tags to exclude. Converted to negated tags while merging.
    /// 需要排除的标签。合并时转换为取反标签。
    pub ignore_tags: Option<ArgValue>,
    pub files: Option<ArgValue>,
    pub reporters: Option<ArgValue>,
    pub timeout: Option<String>,
    pub retries: Option<String>,
    pub failed: bool,
    pub help: bool,
    pub match_all: bool,
    pub force_exit: bool,
    /// Path of the config file, when given with `--config`.
    pub config: Option<PathBuf>,
    /// UI language, when given with `--lang`.
    pub lang: Option<String>,
    /// Bare positional tokens, interpreted as suite names.
    /// 裸位置参数，解释为套件名称。
    pub positional: Vec<String>,
    /// Unrecognized flags, kept verbatim.
    /// 未识别的标志，原样保留。
    pub unknown: BTreeMap<String, FlagValue>,
}

/// Set of filters used to narrow down the tests to run. All present fields
/// are combined with AND; an absent field imposes no constraint.
///
/// 用于缩小待运行测试范围的过滤器集合。所有存在的字段以 AND 组合；
/// 缺失的字段不施加约束。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    pub tests: Option<Vec<String>>,
    pub groups: Option<Vec<String>>,
    /// A leading `!` negates a tag.
    pub tags: Option<Vec<String>>,
    pub files: Option<Vec<String>>,
    pub suites: Option<Vec<String>>,
}

impl Filters {
    /// Returns the values of a filter, treating an empty list as absent.
    pub fn active(values: &Option<Vec<String>>) -> Option<&[String]> {
        values.as_deref().filter(|values| !values.is_empty())
    }
}

/// Filtering layers understood by the refiner.
/// 精炼器能够理解的过滤层。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterLayer {
    Tests,
    Tags,
    Groups,
}

impl FilterLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterLayer::Tests => "tests",
            FilterLayer::Tags => "tags",
            FilterLayer::Groups => "groups",
        }
    }
}

impl fmt::Display for FilterLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{ layer, filters }` entry handed to the refiner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefinerFilter {
    pub layer: FilterLayer,
    pub filters: Vec<String>,
}

/// Callback returning the test files of a suite.
pub type FilesCallback =
    Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Vec<PathBuf>>> + Send + Sync>;

/// Callback invoked with a suite before it is handed to the runner.
pub type SuiteConfigureFn = Arc<dyn Fn(&mut Suite) + Send + Sync>;

/// A collection of test files, defined either as glob patterns or as a
/// callback returning absolute file paths.
///
/// 测试文件集合，可以定义为 glob 模式，也可以定义为返回绝对文件路径的回调。
#[derive(Clone)]
pub enum TestFiles {
    Globs(Vec<String>),
    Callback(FilesCallback),
}

impl TestFiles {
    pub fn glob(pattern: impl Into<String>) -> Self {
        TestFiles::Globs(vec![pattern.into()])
    }

    pub fn globs<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TestFiles::Globs(patterns.into_iter().map(Into::into).collect())
    }

    pub fn callback<F, Fut>(callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<PathBuf>>> + Send + 'static,
    {
        TestFiles::Callback(Arc::new(move || callback().boxed()))
    }
}

impl fmt::Debug for TestFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestFiles::Globs(patterns) => f.debug_tuple("Globs").field(patterns).finish(),
            TestFiles::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl PartialEq for TestFiles {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TestFiles::Globs(a), TestFiles::Globs(b)) => a == b,
            (TestFiles::Callback(a), TestFiles::Callback(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A suite with its timeout and retries fully resolved.
/// 超时和重试均已完全解析的套件。
#[derive(Clone)]
pub struct ResolvedSuite {
    /// Unique within a config.
    pub name: String,
    pub files: TestFiles,
    pub timeout: Duration,
    pub retries: u32,
    pub configure: Option<SuiteConfigureFn>,
}

impl fmt::Debug for ResolvedSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSuite")
            .field("name", &self.name)
            .field("files", &self.files)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

/// A suite selected by the planner, together with its filtered files.
/// 由规划器选中的套件及其过滤后的文件。
#[derive(Clone)]
pub struct PlannedSuite {
    pub name: String,
    pub files: TestFiles,
    pub timeout: Duration,
    pub retries: u32,
    pub configure: Option<SuiteConfigureFn>,
    /// Absolute paths of the files to import, in collection order.
    /// 待导入文件的绝对路径，按收集顺序排列。
    pub files_urls: Vec<PathBuf>,
}

impl PlannedSuite {
    pub fn new(suite: ResolvedSuite, files_urls: Vec<PathBuf>) -> Self {
        Self {
            name: suite.name,
            files: suite.files,
            timeout: suite.timeout,
            retries: suite.retries,
            configure: suite.configure,
            files_urls,
        }
    }
}

impl fmt::Debug for PlannedSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlannedSuite")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("files_urls", &self.files_urls)
            .finish_non_exhaustive()
    }
}

/// The fully resolved description of a run, ready for the execution engine.
///
/// 运行的完整解析描述，可直接交给执行引擎。
#[derive(Debug)]
pub struct ExecutionPlan {
    pub config: NormalizedConfig,
    /// Activated reporters only, in activation order.
    /// 仅包含已激活的报告器，按激活顺序排列。
    pub reporters: Vec<NamedReporter>,
    pub suites: Vec<PlannedSuite>,
    pub refiner_filters: Vec<RefinerFilter>,
}

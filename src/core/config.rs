//! # Configuration Module / 配置模块
//!
//! User-facing configuration in two shapes: `RawConfig`, built in code or
//! from a TOML file, and `NormalizedConfig`, the fully defaulted result of
//! merging the raw config with the command line.
//!
//! 两种形态的用户配置：`RawConfig`（通过代码或 TOML 文件构建）
//! 以及 `NormalizedConfig`（原始配置与命令行合并后的完整默认化结果）。

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::core::engine::{Refiner, Suite};
use crate::core::error::{Error, Result};
use crate::core::hooks::HookHandler;
use crate::core::importer::{CommandImporter, Importer};
use crate::core::models::{Filters, ResolvedSuite, SuiteConfigureFn, TestFiles};
use crate::core::plugins::PluginFn;
use crate::reporting::NamedReporter;

/// A suite as declared by the user. Timeout and retries fall back to the
/// global values when absent.
///
/// 用户声明的套件。缺失的超时和重试将回退到全局值。
#[derive(Clone)]
pub struct TestSuite {
    pub name: String,
    pub files: TestFiles,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub configure: Option<SuiteConfigureFn>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>, files: TestFiles) -> Self {
        Self {
            name: name.into(),
            files,
            timeout: None,
            retries: None,
            configure: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_configure<F>(mut self, configure: F) -> Self
    where
        F: Fn(&mut Suite) + Send + Sync + 'static,
    {
        self.configure = Some(Arc::new(configure));
        self
    }
}

impl fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSuite")
            .field("name", &self.name)
            .field("files", &self.files)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

/// Where the tests come from: a single list of files, or named suites.
/// 测试来源：单一文件列表，或具名套件。
#[derive(Debug, Clone)]
pub enum TestsConfig {
    Files(TestFiles),
    Suites(Vec<TestSuite>),
}

#[derive(Debug, Clone, Default)]
pub struct ReportersConfig {
    pub activated: Option<Vec<String>>,
    pub list: Option<Vec<NamedReporter>>,
}

/// Configuration as provided by the user. Every field except `tests` is optional.
///
/// 用户提供的配置。除 `tests` 外的所有字段均为可选。
#[derive(Clone)]
pub struct RawConfig {
    pub tests: TestsConfig,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub filters: Filters,
    pub reporters: Option<ReportersConfig>,
    pub plugins: Option<Vec<PluginFn>>,
    pub setup: Option<Vec<HookHandler>>,
    pub teardown: Option<Vec<HookHandler>>,
    pub importer: Option<Arc<dyn Importer>>,
    pub refiner: Option<Refiner>,
    pub force_exit: Option<bool>,
    pub configure_suite: Option<SuiteConfigureFn>,
    /// Glob patterns never collected, relative to `cwd`.
    pub exclude: Option<Vec<String>>,
}

impl RawConfig {
    fn with_tests(tests: TestsConfig) -> Self {
        Self {
            tests,
            cwd: None,
            timeout: None,
            retries: None,
            filters: Filters::default(),
            reporters: None,
            plugins: None,
            setup: None,
            teardown: None,
            importer: None,
            refiner: None,
            force_exit: None,
            configure_suite: None,
            exclude: None,
        }
    }

    pub fn files(files: TestFiles) -> Self {
        Self::with_tests(TestsConfig::Files(files))
    }

    pub fn suites(suites: Vec<TestSuite>) -> Self {
        Self::with_tests(TestsConfig::Suites(suites))
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_reporters(mut self, reporters: ReportersConfig) -> Self {
        self.reporters = Some(reporters);
        self
    }

    pub fn with_plugin(mut self, plugin: PluginFn) -> Self {
        self.plugins.get_or_insert_with(Vec::new).push(plugin);
        self
    }

    pub fn with_setup(mut self, hook: HookHandler) -> Self {
        self.setup.get_or_insert_with(Vec::new).push(hook);
        self
    }

    pub fn with_teardown(mut self, hook: HookHandler) -> Self {
        self.teardown.get_or_insert_with(Vec::new).push(hook);
        self
    }

    pub fn with_importer(mut self, importer: Arc<dyn Importer>) -> Self {
        self.importer = Some(importer);
        self
    }

    pub fn with_refiner(mut self, refiner: Refiner) -> Self {
        self.refiner = Some(refiner);
        self
    }

    pub fn with_force_exit(mut self, force_exit: bool) -> Self {
        self.force_exit = Some(force_exit);
        self
    }

    pub fn with_configure_suite<F>(mut self, configure: F) -> Self
    where
        F: Fn(&mut Suite) + Send + Sync + 'static,
    {
        self.configure_suite = Some(Arc::new(configure));
        self
    }

    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(patterns.into_iter().map(Into::into).collect());
        self
    }
}

impl fmt::Debug for RawConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawConfig")
            .field("tests", &self.tests)
            .field("cwd", &self.cwd)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("filters", &self.filters)
            .field("reporters", &self.reporters)
            .field("force_exit", &self.force_exit)
            .field("exclude", &self.exclude)
            .finish_non_exhaustive()
    }
}

/// Tests after merging: suites carry their final timeout and retries.
#[derive(Debug, Clone)]
pub enum ResolvedTests {
    Files(TestFiles),
    Suites(Vec<ResolvedSuite>),
}

#[derive(Debug, Clone, Default)]
pub struct Reporters {
    pub activated: Vec<String>,
    pub list: Vec<NamedReporter>,
}

/// The merged configuration with every default filled in.
///
/// 已填充所有默认值的合并配置。
#[derive(Clone)]
pub struct NormalizedConfig {
    /// Always absolute.
    pub cwd: PathBuf,
    pub tests: ResolvedTests,
    pub timeout: Duration,
    pub retries: u32,
    pub filters: Filters,
    pub reporters: Reporters,
    pub plugins: Vec<PluginFn>,
    pub setup: Vec<HookHandler>,
    pub teardown: Vec<HookHandler>,
    pub importer: Arc<dyn Importer>,
    pub refiner: Refiner,
    pub force_exit: bool,
    pub configure_suite: Option<SuiteConfigureFn>,
    pub exclude: Vec<String>,
    pub match_all_tags: bool,
}

impl NormalizedConfig {
    pub fn is_suites_based(&self) -> bool {
        matches!(self.tests, ResolvedTests::Suites(_))
    }

    /// The configured suites, or an empty slice for a files based config.
    pub fn suites(&self) -> &[ResolvedSuite] {
        match &self.tests {
            ResolvedTests::Suites(suites) => suites,
            ResolvedTests::Files(_) => &[],
        }
    }
}

impl fmt::Debug for NormalizedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedConfig")
            .field("cwd", &self.cwd)
            .field("tests", &self.tests)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("filters", &self.filters)
            .field("reporters", &self.reporters)
            .field("plugins", &self.plugins.len())
            .field("setup", &self.setup.len())
            .field("teardown", &self.teardown.len())
            .field("refiner", &self.refiner)
            .field("force_exit", &self.force_exit)
            .field("exclude", &self.exclude)
            .field("match_all_tags", &self.match_all_tags)
            .finish_non_exhaustive()
    }
}

/// One glob pattern or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FilesSpec {
    One(String),
    Many(Vec<String>),
}

impl From<FilesSpec> for TestFiles {
    fn from(spec: FilesSpec) -> Self {
        match spec {
            FilesSpec::One(pattern) => TestFiles::glob(pattern),
            FilesSpec::Many(patterns) => TestFiles::Globs(patterns),
        }
    }
}

/// A `[[suites]]` entry of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteFile {
    pub name: String,
    pub files: FilesSpec,
    /// Timeout in milliseconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportersFile {
    #[serde(default)]
    pub activated: Option<Vec<String>>,
}

/// The TOML configuration file, usually `suite-runner.toml`.
///
/// TOML 配置文件，通常为 `suite-runner.toml`。
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。
    #[serde(default = "default_language")]
    pub language: String,
    /// Working directory, relative to the config file's directory.
    /// 工作目录，相对于配置文件所在目录。
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub files: Option<FilesSpec>,
    #[serde(default)]
    pub suites: Option<Vec<SuiteFile>>,
    /// Global timeout in milliseconds.
    /// 全局超时（毫秒）。
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub force_exit: Option<bool>,
    /// Command template used to run each test file. `{file}` is replaced by
    /// the file path. Without it, test files are executed directly.
    ///
    /// 用于运行每个测试文件的命令模板。`{file}` 会被替换为文件路径。
    /// 未设置时直接执行测试文件。
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub reporters: Option<ReportersFile>,
    /// Where the `--failed` plugin stores failed test titles.
    #[serde(default)]
    pub failed_cache: Option<PathBuf>,
}

fn default_language() -> String {
    "en".to_string()
}

/// Reads and parses a TOML config file.
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

impl ConfigFile {
    /// Converts the file into a `RawConfig`. Relative paths are resolved
    /// against `config_dir`.
    ///
    /// 将文件转换为 `RawConfig`。相对路径基于 `config_dir` 解析。
    pub fn into_raw_config(self, config_dir: &Path) -> Result<RawConfig> {
        let tests = match (self.files, self.suites) {
            (Some(_), Some(_)) => return Err(Error::ConflictingTestFiles),
            (None, None) => return Err(Error::MissingTestFiles),
            (Some(files), None) => TestsConfig::Files(files.into()),
            (None, Some(suites)) => TestsConfig::Suites(
                suites
                    .into_iter()
                    .map(|suite| TestSuite {
                        name: suite.name,
                        files: suite.files.into(),
                        timeout: suite.timeout.map(Duration::from_millis),
                        retries: suite.retries,
                        configure: None,
                    })
                    .collect(),
            ),
        };

        let cwd = match self.cwd {
            Some(cwd) => config_dir.join(cwd),
            None => config_dir.to_path_buf(),
        };

        let mut raw = RawConfig::with_tests(tests);
        raw.cwd = Some(cwd);
        raw.timeout = self.timeout.map(Duration::from_millis);
        raw.retries = self.retries;
        raw.force_exit = self.force_exit;
        raw.exclude = self.exclude;
        raw.filters = self.filters;
        raw.reporters = self.reporters.map(|reporters| ReportersConfig {
            activated: reporters.activated,
            list: None,
        });
        if let Some(command) = self.command {
            raw.importer = Some(Arc::new(CommandImporter::new(Some(command))));
        }
        Ok(raw)
    }
}

//! # Test Execution Planner Module / 测试执行计划模块
//!
//! This module turns a normalized config into an execution plan: the
//! activated reporters, the selected suites with their filtered test files,
//! and the filters to hand to the refiner.
//!
//! 此模块将规范化配置转换为执行计划：
//! 已激活的报告器、选中的套件及其过滤后的测试文件，以及交给精炼器的过滤器。

use std::path::PathBuf;

use crate::core::config::{NormalizedConfig, ResolvedTests};
use crate::core::error::Result;
use crate::core::files::FileCollector;
use crate::core::models::{
    ExecutionPlan, FilterLayer, Filters, PlannedSuite, RefinerFilter, ResolvedSuite, TestFiles,
};
use crate::core::validator;
use crate::reporting::NamedReporter;

/// Name of the implicit suite of a files based config.
pub const DEFAULT_SUITE_NAME: &str = "default";

/// Plans a run. Construction validates the config, so a `Planner` always
/// holds a config whose reporters and suite filters are consistent.
///
/// 规划一次运行。构造时即校验配置，因此 `Planner` 持有的配置中
/// 报告器和套件过滤器始终是一致的。
#[derive(Debug)]
pub struct Planner {
    config: NormalizedConfig,
    collector: FileCollector,
}

impl Planner {
    /// Validates the config. Fails before any file is touched.
    /// 校验配置。在访问任何文件之前失败。
    pub fn new(config: NormalizedConfig) -> Result<Self> {
        validator::validate(&config)?;
        let collector = FileCollector::new(config.exclude.clone());
        Ok(Self { config, collector })
    }

    /// Builds the execution plan. Suites are collected one after the other,
    /// in declaration order.
    ///
    /// 构建执行计划。套件按声明顺序依次收集。
    pub async fn plan(self) -> Result<ExecutionPlan> {
        let reporters = self.activated_reporters();
        let refiner_filters = self.refiner_filters();

        let mut suites = Vec::new();
        for suite in self.selected_suites() {
            let files_urls = self.collect_files(&suite.files).await?;
            tracing::debug!(suite = %suite.name, files = files_urls.len(), "planned suite");
            suites.push(PlannedSuite::new(suite, files_urls));
        }

        Ok(ExecutionPlan {
            config: self.config,
            reporters,
            suites,
            refiner_filters,
        })
    }

    fn activated_reporters(&self) -> Vec<NamedReporter> {
        let reporters = &self.config.reporters;
        reporters
            .activated
            .iter()
            .filter_map(|name| reporters.list.iter().find(|r| r.name == *name).cloned())
            .collect()
    }

    fn selected_suites(&self) -> Vec<ResolvedSuite> {
        match &self.config.tests {
            ResolvedTests::Files(files) => vec![ResolvedSuite {
                name: DEFAULT_SUITE_NAME.to_string(),
                files: files.clone(),
                timeout: self.config.timeout,
                retries: self.config.retries,
                configure: None,
            }],
            ResolvedTests::Suites(suites) => {
                let filter = Filters::active(&self.config.filters.suites);
                suites
                    .iter()
                    .filter(|suite| filter.is_none_or(|names| names.contains(&suite.name)))
                    .cloned()
                    .collect()
            }
        }
    }

    async fn collect_files(&self, files: &TestFiles) -> Result<Vec<PathBuf>> {
        let collected = self.collector.get_files(&self.config.cwd, files).await?;
        Ok(match Filters::active(&self.config.filters.files) {
            Some(filters) => self.collector.grep(collected, filters),
            None => collected,
        })
    }

    fn refiner_filters(&self) -> Vec<RefinerFilter> {
        let filters = &self.config.filters;
        [
            (FilterLayer::Tests, &filters.tests),
            (FilterLayer::Tags, &filters.tags),
            (FilterLayer::Groups, &filters.groups),
        ]
        .into_iter()
        .filter_map(|(layer, values)| {
            Filters::active(values).map(|values| RefinerFilter {
                layer,
                filters: values.to_vec(),
            })
        })
        .collect()
    }
}

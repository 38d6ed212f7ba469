//! # Run Orchestration Module / 运行编排模块
//!
//! Drives one run from a normalized config to a summary: plugins, planning,
//! global hooks, importing test files into suites and executing them.
//!
//! 驱动一次运行，从规范化配置到结果摘要：
//! 插件、规划、全局钩子、将测试文件导入套件并执行。

use tokio_util::sync::CancellationToken;

use crate::core::config::NormalizedConfig;
use crate::core::engine::{RunSummary, Runner, Suite};
use crate::core::error::{Error, Result};
use crate::core::hooks::GlobalHooks;
use crate::core::importer::ImportContext;
use crate::core::models::{CliArgs, ExecutionPlan, PlannedSuite};
use crate::core::planner::Planner;
use crate::core::plugins::apply_plugins;

/// Runs the tests described by `config`.
///
/// Configuration errors surface before any test file is imported. Once setup
/// started, hook cleanups always run. Teardown hooks only run when setup,
/// imports and execution raised no error; failing tests do not count as
/// errors here and are reported through the summary.
///
/// 运行 `config` 描述的测试。
///
/// 配置错误会在导入任何测试文件之前报告。一旦 setup 开始，钩子的清理处理器
/// 总会运行。只有当 setup、导入和执行均未产生错误时才会运行 teardown 钩子；
/// 失败的测试在这里不算作错误，而是通过结果摘要报告。
pub async fn run(
    config: NormalizedConfig,
    cli: &CliArgs,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let config = apply_plugins(config, cli)?;
    let plan = Planner::new(config)?.plan().await?;
    tracing::debug!(
        suites = plan.suites.len(),
        reporters = plan.reporters.len(),
        filters = ?plan.refiner_filters,
        "execution plan ready"
    );

    let mut hooks = GlobalHooks::new(plan.config.setup.clone(), plan.config.teardown.clone());
    match execute(&plan, &mut hooks, cancel).await {
        Ok(summary) => {
            hooks.teardown(None, Some(&summary)).await?;
            Ok(summary)
        }
        Err(error) => {
            if let Err(cleanup_error) = hooks.teardown(Some(&error), None).await {
                tracing::warn!(error = %cleanup_error, "hook cleanup failed after an aborted run");
            }
            Err(error)
        }
    }
}

async fn execute(
    plan: &ExecutionPlan,
    hooks: &mut GlobalHooks,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let mut runner = create_runner(plan, cancel);
    hooks.setup().await?;

    for planned in &plan.suites {
        let suite = import_suite(&plan.config, planned).await?;
        runner.add(suite);
    }

    runner.start();
    runner.exec().await;
    runner.end();
    Ok(runner.get_summary())
}

fn create_runner(plan: &ExecutionPlan, cancel: CancellationToken) -> Runner {
    let mut refiner = plan.config.refiner.clone();
    for filter in &plan.refiner_filters {
        refiner.add(filter.layer, filter.filters.iter().cloned());
    }
    refiner.match_all_tags(plan.config.match_all_tags);

    let mut runner = Runner::new(refiner).with_cancellation(cancel);
    for reporter in &plan.reporters {
        runner.register_reporter(reporter);
    }
    if let Some(configure) = plan.config.configure_suite.clone() {
        runner.on_suite(move |suite| configure(suite));
    }
    runner
}

async fn import_suite(config: &NormalizedConfig, planned: &PlannedSuite) -> Result<Suite> {
    let suite = Suite::new(planned.name.clone(), planned.timeout, planned.retries);
    let mut ctx = ImportContext::new(config.cwd.clone(), suite);

    for file in &planned.files_urls {
        ctx.set_file(file);
        config
            .importer
            .import(file, &mut ctx)
            .await
            .map_err(|source| Error::Import {
                file: file.clone(),
                source: source.into(),
            })?;
    }

    let mut suite = ctx.into_suite();
    if let Some(configure) = &planned.configure {
        configure(&mut suite);
    }
    Ok(suite)
}

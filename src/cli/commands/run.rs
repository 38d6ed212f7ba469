//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command: it loads the config file,
//! merges it with the command line, runs the tests and turns the summary
//! into an exit code.
//!
//! 此模块实现了 `run` 命令：加载配置文件，与命令行合并，
//! 运行测试并将结果摘要转换为退出码。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::*;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::cli::args::DEFAULT_CONFIG_FILE;
use crate::core::{
    config::load_config_file, execution, merger::ConfigMerger, models::CliArgs,
    plugins::failed_tests_plugin,
};
use crate::infra::{cache::FailedTestsCache, t};

/// Executes the run command with the parsed arguments.
///
/// # Returns
/// `ExitCode::SUCCESS` when no test failed, `ExitCode::FAILURE` otherwise.
pub async fn execute(cli: CliArgs) -> Result<ExitCode> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config_path = absolute(&config_path)?;

    let config_file = load_config_file(&config_path)
        .with_context(|| t!("run.config_load_failed", path = config_path.display()).to_string())?;
    if cli.lang.is_none() {
        rust_i18n::set_locale(&config_file.language);
    }
    println!(
        "{}",
        t!("run.loading_config", path = config_path.display()).cyan()
    );

    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let cache = config_file
        .failed_cache
        .as_ref()
        .map(|path| FailedTestsCache::new(config_dir.join(path)))
        .unwrap_or_default();

    let raw = config_file
        .into_raw_config(&config_dir)?
        .with_plugin(failed_tests_plugin(cache));
    let config = ConfigMerger::new(raw, cli.clone()).hydrate();
    let force_exit = config.force_exit;

    let stop_token = setup_signal_handler();
    let summary = execution::run(config, &cli, stop_token).await?;

    let code = if summary.has_error {
        println!("\n{}", t!("run.tests_failed").red().bold());
        ExitCode::FAILURE
    } else {
        println!("\n{}", t!("run.all_tests_passed").green().bold());
        ExitCode::SUCCESS
    };

    if force_exit {
        tracing::debug!("force exit requested");
        std::process::exit(if summary.has_error { 1 } else { 0 });
    }
    Ok(code)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to resolve the current directory")?;
    Ok(cwd.join(path))
}

/// Sets up a signal handler for graceful shutdown.
fn setup_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\n{}", t!("run.shutdown_signal").yellow());
            token_clone.cancel();
        }
    });

    token
}

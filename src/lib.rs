//! # Suite Runner Library / Suite Runner 库
//!
//! This library provides the core functionality for the suite runner,
//! a configuration-driven test orchestrator: it merges a config with the
//! command line, collects and filters test files per suite, and runs them
//! with per-suite timeouts and retries.
//!
//! 此库为 suite runner 提供核心功能，
//! 这是一个配置驱动的测试编排器：它将配置与命令行合并，
//! 按套件收集并过滤测试文件，并以套件级的超时和重试运行它们。
//!
//! ## Modules / 模块
//!
//! - `core` - Configuration, merging, planning and the execution engine
//! - `infra` - Infrastructure services like glob expansion, command execution and caching
//! - `reporting` - Reporters printing test progress and summaries
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 配置、合并、规划以及执行引擎
//! - `infra` - 基础设施服务，如 glob 展开、命令执行和缓存
//! - `reporting` - 打印测试进度和摘要的报告器
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::execution;
pub use core::models;

/// Environment variable holding the tracing filter, e.g. `suite_runner=debug`.
pub const LOG_ENV: &str = "SUITE_RUNNER_LOG";

/// Sets the UI language.
///
/// The full locale (e.g., "zh-CN") is tried first, then just the language
/// code (e.g., "en"), and finally the default language ("en").
pub fn init(locale: &str) {
    let available_locales = rust_i18n::available_locales!();

    let lang = if available_locales.contains(&locale) {
        locale
    } else {
        locale
            .split('-')
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .unwrap_or("en")
    };

    rust_i18n::set_locale(lang);
}

/// Installs the stderr tracing subscriber, filtered by `SUITE_RUNNER_LOG`
/// (default `warn`).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");

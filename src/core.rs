//! # Core Module / 核心模块
//!
//! This module contains the core functionality of the runner:
//! configuration, merging, file collection, validation, planning and the
//! execution engine.
//!
//! 此模块包含运行器的核心功能：
//! 配置、合并、文件收集、校验、规划以及执行引擎。

pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod files;
pub mod hooks;
pub mod importer;
pub mod merger;
pub mod models;
pub mod planner;
pub mod plugins;
pub mod validator;

// Re-exports
pub use config::{NormalizedConfig, RawConfig, TestSuite};
pub use error::{Error, Result};
pub use merger::ConfigMerger;
pub use models::{CliArgs, ExecutionPlan, Filters, TestFiles};
pub use planner::Planner;

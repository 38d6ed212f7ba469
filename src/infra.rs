//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for the runner,
//! including glob expansion, command execution, the failed tests cache and i18n support.
//!
//! 此模块为运行器提供基础设施服务，
//! 包括 glob 展开、命令执行、失败测试缓存和国际化支持。

pub mod cache;
pub mod command;
pub mod fs;

// Re-export i18n functions for easier access
pub use rust_i18n::t;

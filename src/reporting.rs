//! # Reporting Module / 报告模块
//!
//! Reporters receive the runner's events and print progress and a final
//! summary. Three reporters are built in: `spec` (the default), `dot` and
//! `ndjson`. Custom reporters are registered by name in `reporters.list`.
//!
//! 报告器接收运行器事件，并打印进度和最终摘要。
//! 内置三个报告器：`spec`（默认）、`dot` 和 `ndjson`。
//! 自定义报告器通过名称注册到 `reporters.list` 中。

pub mod console;
pub mod dot;
pub mod ndjson;

use std::fmt;
use std::sync::Arc;

use crate::core::engine::{RunSummary, RunnerEvent};

pub use console::SpecReporter;
pub use dot::DotReporter;
pub use ndjson::NdjsonReporter;

/// Name of the reporter activated when the config lists none.
pub const DEFAULT_REPORTER: &str = "spec";

/// Receives runner events, in lifecycle order.
/// 按生命周期顺序接收运行器事件。
pub trait Reporter: Send {
    fn on_event(&mut self, event: &RunnerEvent);

    /// Called once after the last event.
    fn end(&mut self, summary: &RunSummary);
}

/// Creates a fresh reporter instance for a run.
pub type ReporterHandler = Arc<dyn Fn() -> Box<dyn Reporter> + Send + Sync>;

/// A reporter registered under a unique name.
/// 以唯一名称注册的报告器。
#[derive(Clone)]
pub struct NamedReporter {
    pub name: String,
    pub handler: ReporterHandler,
}

impl NamedReporter {
    pub fn new<F, R>(name: impl Into<String>, create: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Reporter + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(move || Box::new(create()) as Box<dyn Reporter>),
        }
    }
}

impl fmt::Debug for NamedReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedReporter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The built-in reporters, in registration order.
/// 内置报告器，按注册顺序排列。
pub fn builtin_reporters() -> Vec<NamedReporter> {
    vec![
        NamedReporter::new("spec", SpecReporter::default),
        NamedReporter::new("ndjson", NdjsonReporter::default),
        NamedReporter::new("dot", DotReporter::default),
    ]
}

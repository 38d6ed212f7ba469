//! Global setup and teardown hooks.
//!
//! A hook may hand back a cleanup handler. Cleanups of both phases always run
//! at teardown, in reverse registration order, even when the run failed.
//!
//! 钩子可以返回一个清理处理器。两个阶段的清理处理器都会在 teardown 时
//! 按注册顺序的逆序运行，即使运行失败也是如此。

use std::future::Future;
use std::mem;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::core::engine::RunSummary;
use crate::core::error::{Error, Result};

/// State handed to hooks and cleanups.
///
/// `summary` is set once the tests ran. `error` carries the message of the
/// error that aborted the run and is only seen by cleanups.
#[derive(Debug, Clone, Default)]
pub struct HookState {
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
}

pub type HookCleanup = Box<dyn FnOnce(HookState) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

pub type HookHandler =
    Arc<dyn Fn(HookState) -> BoxFuture<'static, anyhow::Result<Option<HookCleanup>>> + Send + Sync>;

/// Wraps an async closure into a `HookHandler`.
pub fn hook<F, Fut>(handler: F) -> HookHandler
where
    F: Fn(HookState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |state| handler(state).map(|result| result.map(|()| None::<HookCleanup>)).boxed())
}

/// Wraps an async closure whose output is the cleanup to run at teardown.
///
/// 包装一个异步闭包，其输出为 teardown 时要运行的清理处理器。
pub fn hook_with_cleanup<F, Fut, C, CFut>(handler: F) -> HookHandler
where
    F: Fn(HookState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<C>> + Send + 'static,
    C: FnOnce(HookState) -> CFut + Send + 'static,
    CFut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |state| {
        handler(state)
            .map(|result| {
                result.map(|handler| {
                    let cleanup: HookCleanup = Box::new(move |state| handler(state).boxed());
                    Some(cleanup)
                })
            })
            .boxed()
    })
}

/// Runs setup hooks before the tests and teardown hooks after them.
/// Hooks of a phase run in registration order and stop at the first failure.
///
/// 在测试前运行 setup 钩子，在测试后运行 teardown 钩子。
/// 同一阶段的钩子按注册顺序运行，并在第一次失败时停止。
#[derive(Default)]
pub struct GlobalHooks {
    setup: Vec<HookHandler>,
    teardown: Vec<HookHandler>,
    setup_cleanups: Vec<HookCleanup>,
    teardown_cleanups: Vec<HookCleanup>,
}

impl GlobalHooks {
    pub fn new(setup: Vec<HookHandler>, teardown: Vec<HookHandler>) -> Self {
        Self {
            setup,
            teardown,
            ..Self::default()
        }
    }

    pub async fn setup(&mut self) -> Result<()> {
        run_phase(
            "setup",
            &self.setup,
            HookState::default(),
            &mut self.setup_cleanups,
        )
        .await
    }

    /// Runs the pending setup cleanups, then the teardown hooks unless the run
    /// failed with `error`, then the teardown cleanups. Every step runs even
    /// when an earlier one fails; the first failure is returned.
    ///
    /// 先运行待处理的 setup 清理，若运行未因 `error` 失败则运行 teardown 钩子，
    /// 最后运行 teardown 清理。即使前一步失败，后续步骤也会运行；返回第一个失败。
    pub async fn teardown(
        &mut self,
        error: Option<&Error>,
        summary: Option<&RunSummary>,
    ) -> Result<()> {
        let state = HookState {
            summary: summary.cloned(),
            error: error.map(error_chain),
        };

        let setup_cleanups = mem::take(&mut self.setup_cleanups);
        let mut outcome = run_cleanups("setup cleanup", setup_cleanups, &state).await;

        if error.is_none() {
            let teardown = run_phase(
                "teardown",
                &self.teardown,
                state.clone(),
                &mut self.teardown_cleanups,
            )
            .await;
            outcome = outcome.and(teardown);
        } else {
            tracing::debug!("skipping teardown hooks after a failed run");
        }

        let teardown_cleanups = mem::take(&mut self.teardown_cleanups);
        let cleanup = run_cleanups("teardown cleanup", teardown_cleanups, &state).await;
        outcome.and(cleanup)
    }
}

/// `outer: inner: root` message of an error and its sources.
fn error_chain(error: &Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

async fn run_phase(
    phase: &'static str,
    hooks: &[HookHandler],
    state: HookState,
    cleanups: &mut Vec<HookCleanup>,
) -> Result<()> {
    tracing::debug!(phase, count = hooks.len(), "running global hooks");
    for handler in hooks {
        let cleanup = handler(state.clone())
            .await
            .map_err(|source| Error::Hook {
                phase,
                source: source.into(),
            })?;
        cleanups.extend(cleanup);
    }
    Ok(())
}

async fn run_cleanups(
    phase: &'static str,
    cleanups: Vec<HookCleanup>,
    state: &HookState,
) -> Result<()> {
    if !cleanups.is_empty() {
        tracing::debug!(phase, count = cleanups.len(), "running hook cleanups");
    }
    let mut outcome = Ok(());
    for cleanup in cleanups.into_iter().rev() {
        if let Err(source) = cleanup(state.clone()).await {
            tracing::warn!(phase, error = %source, "hook cleanup failed");
            if outcome.is_ok() {
                outcome = Err(Error::Hook {
                    phase,
                    source: source.into(),
                });
            }
        }
    }
    outcome
}

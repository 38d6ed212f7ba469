//! # Test File Importer Module / 测试文件导入模块
//!
//! An importer turns a test file into tests registered on the current suite.
//! The `ImportContext` carries the suite being built and the file being
//! imported, so importers never rely on global state.
//!
//! 导入器将测试文件转换为注册到当前套件上的测试。
//! `ImportContext` 携带正在构建的套件和正在导入的文件，因此导入器从不依赖全局状态。

use std::path::{Path, PathBuf};

use anyhow::Context;
use futures::future::{self, BoxFuture};

use crate::core::engine::{Group, Suite, Test};
use crate::infra::command::{build_command, run_captured};
use crate::infra::t;

/// Loads the tests of one file into the import context.
/// 将一个文件中的测试加载到导入上下文中。
pub trait Importer: Send + Sync {
    fn import<'a>(
        &'a self,
        file: &'a Path,
        ctx: &'a mut ImportContext,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// The suite being built and the file currently imported.
/// 正在构建的套件以及当前导入的文件。
#[derive(Debug)]
pub struct ImportContext {
    cwd: PathBuf,
    file: PathBuf,
    suite: Suite,
}

impl ImportContext {
    pub fn new(cwd: impl Into<PathBuf>, suite: Suite) -> Self {
        Self {
            cwd: cwd.into(),
            file: PathBuf::new(),
            suite,
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn suite(&self) -> &Suite {
        &self.suite
    }

    pub(crate) fn set_file(&mut self, file: &Path) {
        self.file = file.to_path_buf();
    }

    /// Registers a test on the suite, stamped with the current file.
    pub fn test(&mut self, mut test: Test) -> &mut Self {
        test.file = Some(self.file.clone());
        self.suite.add_test(test);
        self
    }

    /// Registers a group. The callback only sees the group, so groups cannot nest.
    /// 注册一个分组。回调只能访问该分组，因此分组无法嵌套。
    pub fn group<F>(&mut self, title: impl Into<String>, define: F) -> &mut Self
    where
        F: FnOnce(&mut Group),
    {
        let mut group = Group::new(title);
        group.file = Some(self.file.clone());
        define(&mut group);
        self.suite.add_group(group);
        self
    }

    pub fn into_suite(self) -> Suite {
        self.suite
    }
}

/// Adapts a synchronous registration function into an `Importer`.
pub struct FnImporter<F>(F);

/// Wraps `register` into an importer.
pub fn importer_fn<F>(register: F) -> FnImporter<F>
where
    F: Fn(&Path, &mut ImportContext) -> anyhow::Result<()> + Send + Sync,
{
    FnImporter(register)
}

impl<F> Importer for FnImporter<F>
where
    F: Fn(&Path, &mut ImportContext) -> anyhow::Result<()> + Send + Sync,
{
    fn import<'a>(
        &'a self,
        file: &'a Path,
        ctx: &'a mut ImportContext,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(future::ready((self.0)(file, ctx)))
    }
}

/// Registers one test per file. The test runs the file, either directly or
/// through a command template, and fails on a non-zero exit status.
///
/// 每个文件注册一个测试。该测试直接运行文件或通过命令模板运行，
/// 退出状态非零时失败。
#[derive(Debug, Clone, Default)]
pub struct CommandImporter {
    command: Option<String>,
}

impl CommandImporter {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }
}

impl Importer for CommandImporter {
    fn import<'a>(
        &'a self,
        file: &'a Path,
        ctx: &'a mut ImportContext,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        let title = file
            .strip_prefix(ctx.cwd())
            .unwrap_or(file)
            .to_string_lossy()
            .replace('\\', "/");
        let template = self.command.clone();
        let file_path = file.to_path_buf();
        let cwd = ctx.cwd().to_path_buf();

        ctx.test(Test::new(title).run(move || {
            let template = template.clone();
            let file_path = file_path.clone();
            let cwd = cwd.clone();
            async move {
                let cmd = build_command(template.as_deref(), &file_path, &cwd)?;
                let run = run_captured(cmd)
                    .await
                    .with_context(|| format!("Failed to run {}", file_path.display()))?;
                if !run.status.success() {
                    let code = run
                        .status
                        .code()
                        .map_or_else(|| "signal".to_string(), |code| code.to_string());
                    anyhow::bail!(
                        "{}\n{}",
                        t!("run.command_failed", code = code),
                        run.output.trim_end()
                    );
                }
                Ok(())
            }
        }));

        Box::pin(future::ready(Ok(())))
    }
}

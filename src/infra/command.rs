//! # Command Execution Module / 命令执行模块
//!
//! Builds the process used to run a test file and captures its output.
//!
//! 构建用于运行测试文件的进程并捕获其输出。

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Output};

use anyhow::Context;
use tokio::process::Command;

/// Placeholder replaced by the test file path in command templates.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Builds the command running `file`.
///
/// With a template, environment variables and `~` are expanded first, the
/// result is split into shell words, and `{file}` is replaced inside each
/// word. Without a template the file itself is executed.
///
/// 构建运行 `file` 的命令。
///
/// 使用模板时，先展开环境变量和 `~`，再将结果拆分为 shell 单词，
/// 并在每个单词中替换 `{file}`。没有模板时直接执行文件本身。
pub fn build_command(
    template: Option<&str>,
    file: &Path,
    cwd: &Path,
) -> anyhow::Result<Command> {
    let file_arg = file.to_string_lossy();
    let parts = match template {
        None => vec![file_arg.to_string()],
        Some(template) => {
            let expanded = shellexpand::full(template)
                .with_context(|| format!("Failed to expand command: {template}"))?
                .to_string();
            let words = shlex::split(&expanded)
                .ok_or_else(|| anyhow::anyhow!("Failed to parse command: {}", expanded))?;
            words
                .into_iter()
                .map(|word| word.replace(FILE_PLACEHOLDER, &file_arg))
                .collect()
        }
    };

    let (program, args) = parts
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("Empty command after parsing."))?;

    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true).current_dir(cwd);
    Ok(cmd)
}

/// Exit status and output of a finished test process.
#[derive(Debug)]
pub struct CapturedRun {
    pub status: ExitStatus,
    /// stdout followed by stderr, lossily decoded.
    pub output: String,
}

/// Runs `cmd` to completion with stdin closed and both output streams piped.
///
/// Commands from `build_command` are `kill_on_drop`, so dropping the returned
/// future stops the process.
///
/// 运行 `cmd` 直至结束，关闭 stdin 并通过管道读取两个输出流。
pub async fn run_captured(mut cmd: Command) -> io::Result<CapturedRun> {
    let Output {
        status,
        stdout,
        stderr,
    } = cmd.output().await?;

    let mut output = String::from_utf8_lossy(&stdout).into_owned();
    if !stderr.is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&String::from_utf8_lossy(&stderr));
    }
    Ok(CapturedRun { status, output })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_substitutes_file_in_every_word() {
        let cmd = build_command(
            Some("sh -c 'echo {file}' {file}"),
            Path::new("/tmp/a b.sh"),
            Path::new("/tmp"),
        )
        .unwrap();
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "sh");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(args, ["-c", "echo /tmp/a b.sh", "/tmp/a b.sh"]);
        assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/tmp")));
    }

    #[test]
    fn without_template_the_file_is_the_program() {
        let cmd = build_command(None, Path::new("/tmp/run.sh"), Path::new("/")).unwrap();
        assert_eq!(cmd.as_std().get_program(), "/tmp/run.sh");
        assert_eq!(cmd.as_std().get_args().count(), 0);
    }

    #[test]
    fn empty_template_is_rejected() {
        assert!(build_command(Some("   "), Path::new("a"), Path::new("/")).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captured_run_keeps_status_and_both_streams() {
        let cmd = build_command(
            Some("sh -c 'echo checking; echo broken >&2; exit 3'"),
            Path::new("unused"),
            Path::new("/"),
        )
        .unwrap();

        let run = run_captured(cmd).await.unwrap();
        assert_eq!(run.status.code(), Some(3));
        assert_eq!(run.output, "checking\nbroken\n");
    }

    #[tokio::test]
    async fn missing_programs_report_an_io_error() {
        let cmd = build_command(
            None,
            Path::new("/definitely/not/a/test-runner"),
            Path::new("/"),
        )
        .unwrap();
        assert!(run_captured(cmd).await.is_err());
    }
}

//! # Command Line Interface / 命令行接口
//!
//! Entry point of the binary: parses `argv`, selects the UI language and
//! dispatches to the `run` command.
//!
//! 程序入口：解析 `argv`，选择界面语言并分发到 `run` 命令。

use std::env;
use std::process::ExitCode;

use anyhow::Result;

pub mod args;
pub mod commands;

pub use args::{CliParser, get_help};

pub async fn run() -> Result<ExitCode> {
    let cli = CliParser::new(env::args().skip(1)).parse()?;

    // Until the config file is read, --lang or the system language applies.
    match &cli.lang {
        Some(lang) => crate::init(lang),
        None => crate::init(&sys_locale::get_locale().unwrap_or_else(|| "en".to_string())),
    }

    if cli.help {
        println!("{}", get_help());
        return Ok(ExitCode::SUCCESS);
    }

    commands::run::execute(cli).await
}

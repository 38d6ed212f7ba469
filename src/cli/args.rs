//! # Argument Parsing Module / 参数解析模块
//!
//! Parses `argv` into `CliArgs`. Known flags are handled by clap; unknown
//! `--flag[=value]` and `-x[=value]` tokens are split out beforehand and kept
//! verbatim so plugins can read them. Values are never split on commas here.
//!
//! 将 `argv` 解析为 `CliArgs`。已知标志由 clap 处理；未知的 `--flag[=value]`
//! 和 `-x[=value]` 会预先分离并原样保留，供插件读取。此处从不按逗号拆分值。

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::core::models::{ArgValue, CliArgs, FlagValue};
use crate::infra::t;

const STRING_FLAGS: &[&str] = &[
    "tests",
    "groups",
    "tags",
    "ignore-tags",
    "files",
    "timeout",
    "retries",
    "reporters",
    "config",
    "lang",
];

const BOOL_FLAGS: &[&str] = &[
    "help",
    "match-all",
    "matchAll",
    "failed",
    "force-exit",
    "forceExit",
];

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "suite-runner.toml";

fn string_arg(name: &'static str, value_name: &'static str, help: String) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name(value_name)
        .help(help)
        .allow_hyphen_values(true)
        .action(ArgAction::Append)
}

fn build_cli() -> Command {
    Command::new("suite-runner")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about").to_string())
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .args_override_self(true)
        .arg(string_arg("tests", "TITLES", t!("cli.tests").to_string()))
        .arg(string_arg("groups", "TITLES", t!("cli.groups").to_string()))
        .arg(string_arg("tags", "TAGS", t!("cli.tags").to_string()))
        .arg(string_arg("ignore-tags", "TAGS", t!("cli.ignore_tags").to_string()))
        .arg(string_arg("files", "FILES", t!("cli.files").to_string()))
        .arg(string_arg("timeout", "MS", t!("cli.timeout").to_string()))
        .arg(string_arg("retries", "COUNT", t!("cli.retries").to_string()))
        .arg(string_arg("reporters", "NAMES", t!("cli.reporters").to_string()))
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("CONFIG")
                .help(t!("cli.config", file = DEFAULT_CONFIG_FILE).to_string())
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("lang")
                .long("lang")
                .value_name("LANGUAGE")
                .help(t!("cli.lang").to_string())
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("match-all")
                .long("match-all")
                .alias("matchAll")
                .help(t!("cli.match_all").to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("failed")
                .long("failed")
                .help(t!("cli.failed").to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("force-exit")
                .long("force-exit")
                .alias("forceExit")
                .help(t!("cli.force_exit").to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("help")
                .short('h')
                .long("help")
                .help(t!("cli.help").to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("suites")
                .value_name("SUITES")
                .help(t!("cli.suites").to_string())
                .num_args(1..)
                .action(ArgAction::Append),
        )
}

/// Returns the usage text.
/// 返回用法说明文本。
pub fn get_help() -> String {
    build_cli().render_help().to_string()
}

/// Parses command-line arguments, without the binary name.
/// 解析命令行参数（不含程序名）。
pub struct CliParser {
    argv: Vec<String>,
}

impl CliParser {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    pub fn parse(self) -> Result<CliArgs, clap::Error> {
        let (known, trailing, unknown) = split_unknown_flags(self.argv);
        let matches = build_cli().try_get_matches_from(known)?;

        let mut positional = strings(&matches, "suites");
        positional.extend(trailing);

        Ok(CliArgs {
            tests: arg_value(&matches, "tests"),
            groups: arg_value(&matches, "groups"),
            tags: arg_value(&matches, "tags"),
            ignore_tags: arg_value(&matches, "ignore-tags"),
            files: arg_value(&matches, "files"),
            reporters: arg_value(&matches, "reporters"),
            timeout: arg_value(&matches, "timeout").map(|value| value.last().to_string()),
            retries: arg_value(&matches, "retries").map(|value| value.last().to_string()),
            failed: matches.get_flag("failed"),
            help: matches.get_flag("help"),
            match_all: matches.get_flag("match-all"),
            force_exit: matches.get_flag("force-exit"),
            config: matches.get_one::<PathBuf>("config").cloned(),
            lang: matches.get_one::<String>("lang").cloned(),
            positional,
            unknown,
        })
    }
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn arg_value(matches: &ArgMatches, id: &str) -> Option<ArgValue> {
    ArgValue::from_occurrences(strings(matches, id))
}

/// Splits `argv` into the tokens clap understands, the tokens after `--`
/// and the unknown flags.
fn split_unknown_flags(
    argv: Vec<String>,
) -> (Vec<String>, Vec<String>, BTreeMap<String, FlagValue>) {
    let mut known = Vec::new();
    let mut unknown = BTreeMap::new();
    let mut tokens = argv.into_iter();

    while let Some(token) = tokens.next() {
        if token == "--" {
            return (known, tokens.collect(), unknown);
        }

        let Some(flag) = token.strip_prefix("--") else {
            match token.strip_prefix('-') {
                Some(flags) if !flags.is_empty() => {
                    split_short_flags(flags, &mut known, &mut unknown)
                }
                _ => known.push(token),
            }
            continue;
        };
        let (name, inline_value) = match flag.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (flag, None),
        };

        if STRING_FLAGS.contains(&name) {
            let needs_value = inline_value.is_none();
            known.push(token.clone());
            if needs_value {
                known.extend(tokens.next());
            }
        } else if BOOL_FLAGS.contains(&name) {
            known.push(token.clone());
        } else {
            let name = name.to_string();
            match inline_value {
                Some(value) => record_unknown(&mut unknown, name, value.to_string()),
                None => {
                    unknown.insert(name, FlagValue::Bool(true));
                }
            }
        }
    }

    (known, Vec::new(), unknown)
}

/// `-h` is the only known short flag. Any other letter of a `-abc` cluster
/// becomes a boolean unknown flag, and `-x=value` carries a value.
fn split_short_flags(
    flags: &str,
    known: &mut Vec<String>,
    unknown: &mut BTreeMap<String, FlagValue>,
) {
    if let Some((name, value)) = flags.split_once('=') {
        if name == "h" {
            known.push("-h".to_string());
        } else {
            record_unknown(unknown, name.to_string(), value.to_string());
        }
        return;
    }

    for letter in flags.chars() {
        if letter == 'h' {
            known.push("-h".to_string());
        } else {
            unknown.insert(letter.to_string(), FlagValue::Bool(true));
        }
    }
}

fn record_unknown(unknown: &mut BTreeMap<String, FlagValue>, name: String, value: String) {
    let entry = unknown.remove(&name);
    let merged = match entry {
        Some(FlagValue::One(first)) => FlagValue::Many(vec![first, value]),
        Some(FlagValue::Many(mut values)) => {
            values.push(value);
            FlagValue::Many(values)
        }
        Some(FlagValue::Bool(_)) | None => FlagValue::One(value),
    };
    unknown.insert(name, merged);
}

//! # CLI Argument Parsing Unit Tests / 命令行参数解析单元测试

mod common;

use common::cli;
use suite_runner::cli::{CliParser, get_help};
use suite_runner::core::models::{ArgValue, FlagValue};

#[test]
fn no_arguments_yield_defaults() {
    let args = cli(&[]);
    assert_eq!(args, Default::default());
}

#[test]
fn single_flag_stays_a_single_string() {
    let args = cli(&["--tags=@slow,@fast"]);
    assert_eq!(args.tags, Some(ArgValue::One("@slow,@fast".to_string())));
}

#[test]
fn repeated_flags_collect_into_a_list() {
    let args = cli(&["--tags", "@slow", "--tags=@fast"]);
    assert_eq!(
        args.tags,
        Some(ArgValue::Many(vec!["@slow".to_string(), "@fast".to_string()]))
    );
}

#[test]
fn boolean_flags_accept_both_spellings() {
    let args = cli(&["--matchAll", "--force-exit", "--failed", "-h"]);
    assert!(args.match_all);
    assert!(args.force_exit);
    assert!(args.failed);
    assert!(args.help);

    let args = cli(&["--match-all", "--forceExit", "--help"]);
    assert!(args.match_all);
    assert!(args.force_exit);
    assert!(args.help);
}

#[test]
fn timeout_and_retries_stay_strings() {
    let args = cli(&["--timeout=abc", "--retries", "3"]);
    assert_eq!(args.timeout.as_deref(), Some("abc"));
    assert_eq!(args.retries.as_deref(), Some("3"));

    let args = cli(&["--timeout=1", "--timeout=2"]);
    assert_eq!(args.timeout.as_deref(), Some("2"));
}

#[test]
fn positional_tokens_are_suite_names() {
    let args = cli(&["unit", "--tests", "adds", "functional"]);
    assert_eq!(args.positional, vec!["unit", "functional"]);
    assert_eq!(args.tests, Some(ArgValue::One("adds".to_string())));
}

#[test]
fn unknown_flags_pass_through() {
    let args = cli(&["--browser=firefox", "--headless", "--ignore-tags=@flaky"]);
    assert_eq!(
        args.unknown.get("browser"),
        Some(&FlagValue::One("firefox".to_string()))
    );
    assert_eq!(args.unknown.get("headless"), Some(&FlagValue::Bool(true)));
    assert_eq!(args.ignore_tags, Some(ArgValue::One("@flaky".to_string())));
    assert!(!args.unknown.contains_key("ignore-tags"));
}

#[test]
fn unknown_short_flags_pass_through() {
    let args = cli(&["-v", "unit", "-h", "-p=8080"]);
    assert!(args.help);
    assert_eq!(args.positional, vec!["unit"]);
    assert_eq!(args.unknown.get("v"), Some(&FlagValue::Bool(true)));
    assert_eq!(
        args.unknown.get("p"),
        Some(&FlagValue::One("8080".to_string()))
    );
}

#[test]
fn values_may_start_with_a_hyphen() {
    let args = cli(&["--tests", "-negative title"]);
    assert_eq!(args.tests, Some(ArgValue::One("-negative title".to_string())));
}

#[test]
fn config_and_lang_are_recognized() {
    let args = cli(&["--config", "ci/suite-runner.toml", "--lang=zh-CN"]);
    assert_eq!(
        args.config.as_deref(),
        Some(std::path::Path::new("ci/suite-runner.toml"))
    );
    assert_eq!(args.lang.as_deref(), Some("zh-CN"));
}

#[test]
fn parsing_is_pure() {
    let argv = ["--tags=@a", "unit", "--custom=1"];
    assert_eq!(
        CliParser::new(argv).parse().unwrap(),
        CliParser::new(argv).parse().unwrap()
    );
}

#[test]
fn help_lists_every_flag() {
    let help = get_help();
    for flag in [
        "--tests",
        "--groups",
        "--tags",
        "--ignore-tags",
        "--files",
        "--timeout",
        "--retries",
        "--reporters",
        "--force-exit",
        "--match-all",
        "--failed",
        "--help",
    ] {
        assert!(help.contains(flag), "help is missing {flag}");
    }
}

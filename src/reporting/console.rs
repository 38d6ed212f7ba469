//! # Console Reporting Module / 控制台报告模块
//!
//! The `spec` reporter prints every suite, group and test as it finishes,
//! followed by a summary and the details of each failed test.
//! The summary and failure rendering is shared with the `dot` reporter.
//!
//! `spec` 报告器在每个套件、分组和测试完成时打印它们，
//! 随后打印摘要以及每个失败测试的详细信息。
//! 摘要和失败详情的渲染与 `dot` 报告器共享。

use colored::*;

use crate::core::engine::{RunSummary, RunnerEvent, TestEndNode, TestStatus};
use crate::infra::t;
use crate::reporting::Reporter;

/// Prints tests as a tree of suites and groups.
#[derive(Debug, Default)]
pub struct SpecReporter {
    in_group: bool,
    failures: Vec<TestEndNode>,
}

impl Reporter for SpecReporter {
    fn on_event(&mut self, event: &RunnerEvent) {
        match event {
            RunnerEvent::SuiteStart { name } => {
                println!("\n{}", name.bold().underline());
            }
            RunnerEvent::GroupStart { title } => {
                self.in_group = true;
                println!("\n  {}", title.bold());
            }
            RunnerEvent::GroupEnd { .. } => self.in_group = false,
            RunnerEvent::TestEnd(node) => {
                let indent = if self.in_group { "    " } else { "  " };
                println!("{indent}{}", render_test_line(node));
                if node.status == TestStatus::Failed {
                    self.failures.push(node.clone());
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, summary: &RunSummary) {
        print_summary(summary);
        print_failure_details(&self.failures);
    }
}

/// Renders one finished test, e.g. `✔ creates a user (12ms)`.
pub fn render_test_line(node: &TestEndNode) -> String {
    let mut line = match node.status {
        TestStatus::Passed => format!("{} {}", "✔".green(), node.title.dimmed()),
        TestStatus::Failed => format!("{} {}", "✖".red(), node.title.red()),
        TestStatus::Skipped => format!("{} {}", "-".yellow(), node.title.yellow()),
        TestStatus::Todo => format!("{} {}", "-".cyan(), node.title.cyan()),
    };

    if matches!(node.status, TestStatus::Passed | TestStatus::Failed) {
        line.push_str(&format!(" {}", format!("({}ms)", node.duration_ms).dimmed()));
    }
    if node.retry_attempt > 1 {
        line.push_str(&format!(
            " {}",
            t!("report.retry_attempt", attempt = node.retry_attempt - 1, retries = node.retries)
                .yellow()
        ));
    }
    line
}

/// Renders the aggregated counters of a run.
///
/// ```text
/// --- Test Summary ---
///   - Result   : PASSED
///   - Tests    : 3 passed (3)
///   - Duration : 120ms
/// ```
pub fn render_summary(summary: &RunSummary) -> String {
    let aggregates = &summary.aggregates;
    let result = if summary.has_error {
        t!("report.failed_result").red().bold()
    } else {
        t!("report.passed_result").green().bold()
    };

    let mut counts = Vec::new();
    if aggregates.passed > 0 {
        counts.push(t!("report.passed", count = aggregates.passed).green().to_string());
    }
    if aggregates.failed > 0 {
        counts.push(t!("report.failed", count = aggregates.failed).red().to_string());
    }
    if aggregates.skipped > 0 {
        counts.push(t!("report.skipped", count = aggregates.skipped).yellow().to_string());
    }
    if aggregates.todo > 0 {
        counts.push(t!("report.todo", count = aggregates.todo).cyan().to_string());
    }
    let counts = if counts.is_empty() {
        t!("report.no_tests").dimmed().to_string()
    } else {
        format!("{} ({})", counts.join(", "), aggregates.total)
    };

    [
        format!("{}", t!("report.summary_banner").bold()),
        format!("  - {:<9}: {}", t!("report.result_label"), result),
        format!("  - {:<9}: {}", t!("report.tests_label"), counts),
        format!("  - {:<9}: {}ms", t!("report.duration_label"), summary.duration_ms),
    ]
    .join("\n")
}

pub fn print_summary(summary: &RunSummary) {
    println!("\n{}", render_summary(summary));
}

/// Prints the error of every failed test.
///
/// 打印每个失败测试的错误信息。
pub fn print_failure_details(failures: &[TestEndNode]) {
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("report.failures_banner").red().bold());
    println!("{}", "-".repeat(80));

    for (i, node) in failures.iter().enumerate() {
        let location = node
            .file
            .as_ref()
            .map(|file| format!(" ({})", file.display()))
            .unwrap_or_default();
        println!(
            "[{}/{}] {} '{}'{}",
            i + 1,
            failures.len(),
            t!("report.failure_header").red(),
            node.title.cyan(),
            location.dimmed()
        );
        if let Some(error) = &node.error {
            println!("\n{}", error);
        }
        println!("\n{}", "-".repeat(80));
    }
}

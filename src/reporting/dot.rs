//! Minimal reporter printing one symbol per test.

use std::io::Write;

use colored::*;

use crate::core::engine::{RunSummary, RunnerEvent, TestEndNode, TestStatus};
use crate::reporting::Reporter;
use crate::reporting::console::{print_failure_details, print_summary};

#[derive(Debug, Default)]
pub struct DotReporter {
    failures: Vec<TestEndNode>,
}

/// Symbol printed for a finished test.
pub fn dot_for(status: TestStatus) -> ColoredString {
    match status {
        TestStatus::Passed => "•".green(),
        TestStatus::Failed => "×".red(),
        TestStatus::Skipped => "-".yellow(),
        TestStatus::Todo => "-".cyan(),
    }
}

impl Reporter for DotReporter {
    fn on_event(&mut self, event: &RunnerEvent) {
        if let RunnerEvent::TestEnd(node) = event {
            print!("{}", dot_for(node.status));
            if let Err(error) = std::io::stdout().flush() {
                tracing::debug!(%error, "failed to flush stdout");
            }
            if node.status == TestStatus::Failed {
                self.failures.push(node.clone());
            }
        }
    }

    fn end(&mut self, summary: &RunSummary) {
        println!();
        print_summary(summary);
        print_failure_details(&self.failures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_has_a_symbol() {
        colored::control::set_override(false);
        assert_eq!(dot_for(TestStatus::Passed).to_string(), "•");
        assert_eq!(dot_for(TestStatus::Failed).to_string(), "×");
        assert_eq!(dot_for(TestStatus::Todo).to_string(), "-");
    }
}

//! Reporter printing suite, group and test progress as newline delimited JSON.

use serde::Serialize;

use crate::core::engine::{Aggregates, RunSummary, RunnerEvent};
use crate::reporting::Reporter;

#[derive(Debug, Default)]
pub struct NdjsonReporter;

/// The JSON line for an event, if the event is reported.
pub fn event_line(event: &RunnerEvent) -> Option<String> {
    match event {
        RunnerEvent::RunnerStart | RunnerEvent::RunnerEnd | RunnerEvent::TestStart { .. } => None,
        _ => serde_json::to_string(event).ok(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryLine<'a> {
    aggregates: &'a Aggregates,
    duration: u64,
    failed_tests_titles: &'a [String],
    has_error: bool,
}

/// The final JSON line describing the run.
pub fn summary_line(summary: &RunSummary) -> String {
    let line = SummaryLine {
        aggregates: &summary.aggregates,
        duration: summary.duration_ms,
        failed_tests_titles: &summary.failed_tests_titles,
        has_error: summary.has_error,
    };
    serde_json::to_string(&line).unwrap_or_default()
}

impl Reporter for NdjsonReporter {
    fn on_event(&mut self, event: &RunnerEvent) {
        if let Some(line) = event_line(event) {
            println!("{line}");
        }
    }

    fn end(&mut self, summary: &RunSummary) {
        println!("{}", summary_line(summary));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::{TestEndNode, TestStatus};

    #[test]
    fn test_end_line_is_tagged_with_the_event_name() {
        let event = RunnerEvent::TestEnd(TestEndNode {
            title: "adds".to_string(),
            suite: "unit".to_string(),
            group: Some("math".to_string()),
            file: None,
            status: TestStatus::Failed,
            duration_ms: 3,
            retry_attempt: 1,
            retries: 0,
            error: Some("boom".to_string()),
        });

        let value: serde_json::Value =
            serde_json::from_str(&event_line(&event).unwrap()).unwrap();
        assert_eq!(value["event"], "test:end");
        assert_eq!(value["title"], "adds");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "boom");
    }

    #[test]
    fn lifecycle_only_events_are_not_reported() {
        assert!(event_line(&RunnerEvent::RunnerStart).is_none());
        assert!(event_line(&RunnerEvent::TestStart { title: "x".into() }).is_none());
    }

    #[test]
    fn summary_line_uses_camel_case_keys() {
        let line = summary_line(&RunSummary::default());
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["hasError"], false);
        assert_eq!(value["aggregates"]["total"], 0);
        assert!(value["failedTestsTitles"].as_array().unwrap().is_empty());
    }
}

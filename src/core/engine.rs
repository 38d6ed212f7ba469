//! # Test Execution Engine Module / 测试执行引擎模块
//!
//! A small sequential engine that executes the suites produced from an
//! execution plan. It provides the `Suite`, `Group` and `Test` primitives,
//! the `Refiner` deciding which tests run, and the `Runner` that drives the
//! lifecycle, applies timeouts and retries, and emits events to reporters.
//!
//! 一个小型的顺序执行引擎，用于执行由执行计划生成的套件。
//! 它提供 `Suite`、`Group` 和 `Test` 原语，决定哪些测试运行的 `Refiner`，
//! 以及驱动生命周期、应用超时与重试并向报告器发送事件的 `Runner`。

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::core::models::FilterLayer;
use crate::infra::t;
use crate::reporting::{NamedReporter, Reporter};

/// The body of a test.
pub type TestFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Callback invoked for every suite added to the runner.
pub type SuiteCallback = Box<dyn FnMut(&mut Suite) + Send>;

/// An individual test. A test without a body is reported as todo.
/// 单个测试。没有测试体的测试会被报告为 todo。
#[derive(Clone)]
pub struct Test {
    pub title: String,
    pub tags: Vec<String>,
    /// Overrides the suite timeout when set.
    pub timeout: Option<Duration>,
    /// Overrides the suite retries when set.
    pub retries: Option<u32>,
    pub file: Option<PathBuf>,
    /// Title of the enclosing group, filled in by `Group::add`.
    pub group: Option<String>,
    body: Option<TestFn>,
}

impl Test {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tags: Vec::new(),
            timeout: None,
            retries: None,
            file: None,
            group: None,
            body: None,
        }
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn run<F, Fut>(mut self, body: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.body = Some(Arc::new(move || body().boxed()));
        self
    }

    pub fn is_todo(&self) -> bool {
        self.body.is_none()
    }
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("title", &self.title)
            .field("tags", &self.tags)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("file", &self.file)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

/// A titled collection of tests.
#[derive(Debug, Clone)]
pub struct Group {
    pub title: String,
    pub file: Option<PathBuf>,
    tests: Vec<Test>,
}

impl Group {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            file: None,
            tests: Vec::new(),
        }
    }

    pub fn add(&mut self, mut test: Test) -> &mut Self {
        test.group = Some(self.title.clone());
        if test.file.is_none() {
            test.file = self.file.clone();
        }
        self.tests.push(test);
        self
    }

    pub fn tests(&self) -> &[Test] {
        &self.tests
    }
}

#[derive(Debug, Clone)]
pub enum SuiteEntry {
    Test(Test),
    Group(Group),
}

/// A named collection of tests and groups sharing a timeout and retry policy.
/// 共享超时和重试策略的具名测试与分组集合。
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    pub timeout: Duration,
    pub retries: u32,
    entries: Vec<SuiteEntry>,
}

impl Suite {
    pub fn new(name: impl Into<String>, timeout: Duration, retries: u32) -> Self {
        Self {
            name: name.into(),
            timeout,
            retries,
            entries: Vec::new(),
        }
    }

    pub fn add_test(&mut self, test: Test) -> &mut Self {
        self.entries.push(SuiteEntry::Test(test));
        self
    }

    pub fn add_group(&mut self, group: Group) -> &mut Self {
        self.entries.push(SuiteEntry::Group(group));
        self
    }

    pub fn entries(&self) -> &[SuiteEntry] {
        &self.entries
    }

    /// Iterates over every test of the suite, grouped or not.
    pub fn tests(&self) -> impl Iterator<Item = &Test> {
        self.entries.iter().flat_map(|entry| match entry {
            SuiteEntry::Test(test) => std::slice::from_ref(test).iter(),
            SuiteEntry::Group(group) => group.tests.iter(),
        })
    }
}

/// Decides whether a test should run, based on the tests, groups and tags
/// filters. Every non-empty layer must allow a test for it to run.
///
/// 根据测试、分组和标签过滤器决定某个测试是否运行。
/// 每个非空的过滤层都必须允许该测试，测试才会运行。
#[derive(Debug, Clone, Default)]
pub struct Refiner {
    tests: Vec<String>,
    groups: Vec<String>,
    tags: Vec<String>,
    match_all_tags: bool,
}

impl Refiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<I, S>(&mut self, layer: FilterLayer, filters: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = filters.into_iter().map(Into::into);
        match layer {
            FilterLayer::Tests => self.tests.extend(values),
            FilterLayer::Groups => self.groups.extend(values),
            FilterLayer::Tags => self.tags.extend(values),
        }
        self
    }

    /// Require every positive tag instead of any of them.
    pub fn match_all_tags(&mut self, state: bool) -> &mut Self {
        self.match_all_tags = state;
        self
    }

    pub fn allows(&self, test: &Test) -> bool {
        self.allows_by_group(test) && self.allows_by_title(test) && self.allows_by_tags(test)
    }

    fn allows_by_title(&self, test: &Test) -> bool {
        self.tests.is_empty() || self.tests.iter().any(|title| *title == test.title)
    }

    fn allows_by_group(&self, test: &Test) -> bool {
        if self.groups.is_empty() {
            return true;
        }
        test.group
            .as_ref()
            .is_some_and(|group| self.groups.iter().any(|title| title == group))
    }

    fn allows_by_tags(&self, test: &Test) -> bool {
        if self.tags.is_empty() {
            return true;
        }

        let (negated, positive): (Vec<&str>, Vec<&str>) = self
            .tags
            .iter()
            .map(String::as_str)
            .partition(|tag| tag.starts_with('!'));

        let has_tag = |tag: &str| test.tags.iter().any(|own| own == tag);
        if negated.iter().any(|tag| has_tag(&tag[1..])) {
            return false;
        }
        if positive.is_empty() {
            return true;
        }
        if self.match_all_tags {
            positive.iter().all(|tag| has_tag(tag))
        } else {
            positive.iter().any(|tag| has_tag(tag))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    Todo,
}

/// Payload of the `test:end` event.
/// `test:end` 事件的负载。
#[derive(Debug, Clone, Serialize)]
pub struct TestEndNode {
    pub title: String,
    pub suite: String,
    pub group: Option<String>,
    pub file: Option<PathBuf>,
    pub status: TestStatus,
    pub duration_ms: u64,
    /// Number of the attempt that produced this result, starting at 1.
    pub retry_attempt: u32,
    pub retries: u32,
    pub error: Option<String>,
}

/// Events emitted by the runner, in lifecycle order.
/// 运行器按生命周期顺序发出的事件。
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum RunnerEvent {
    #[serde(rename = "runner:start")]
    RunnerStart,
    #[serde(rename = "suite:start")]
    SuiteStart { name: String },
    #[serde(rename = "suite:end")]
    SuiteEnd { name: String, has_error: bool },
    #[serde(rename = "group:start")]
    GroupStart { title: String },
    #[serde(rename = "group:end")]
    GroupEnd { title: String, has_error: bool },
    #[serde(rename = "test:start")]
    TestStart { title: String },
    #[serde(rename = "test:end")]
    TestEnd(TestEndNode),
    #[serde(rename = "runner:end")]
    RunnerEnd,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Aggregates {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub todo: usize,
}

/// Aggregated outcome of a run, used to decide the exit code.
/// 运行的汇总结果，用于决定进程退出码。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub aggregates: Aggregates,
    pub duration_ms: u64,
    pub failed_tests_titles: Vec<String>,
    pub has_error: bool,
}

/// Executes suites sequentially and reports their progress.
/// 顺序执行套件并报告其进度。
pub struct Runner {
    refiner: Refiner,
    suites: Vec<Suite>,
    reporters: Vec<Box<dyn Reporter>>,
    suite_callbacks: Vec<SuiteCallback>,
    summary: RunSummary,
    started_at: Option<Instant>,
    cancel: CancellationToken,
}

impl Runner {
    pub fn new(refiner: Refiner) -> Self {
        Self {
            refiner,
            suites: Vec::new(),
            reporters: Vec::new(),
            suite_callbacks: Vec::new(),
            summary: RunSummary::default(),
            started_at: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops executing further tests once the token is cancelled.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn refiner(&self) -> &Refiner {
        &self.refiner
    }

    pub fn suites(&self) -> &[Suite] {
        &self.suites
    }

    /// Registers a callback invoked with every suite added afterwards.
    pub fn on_suite<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnMut(&mut Suite) + Send + 'static,
    {
        self.suite_callbacks.push(Box::new(callback));
        self
    }

    pub fn add(&mut self, mut suite: Suite) -> &mut Self {
        for callback in &mut self.suite_callbacks {
            callback(&mut suite);
        }
        self.suites.push(suite);
        self
    }

    pub fn register_reporter(&mut self, reporter: &NamedReporter) -> &mut Self {
        self.reporters.push((reporter.handler)());
        self
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
        self.emit(&RunnerEvent::RunnerStart);
    }

    pub async fn exec(&mut self) {
        let suites = std::mem::take(&mut self.suites);
        for suite in &suites {
            self.emit(&RunnerEvent::SuiteStart {
                name: suite.name.clone(),
            });
            let failed_before = self.summary.aggregates.failed;

            for entry in suite.entries() {
                match entry {
                    SuiteEntry::Test(test) => self.run_test(test, suite).await,
                    SuiteEntry::Group(group) => {
                        if !group.tests().iter().any(|test| self.refiner.allows(test)) {
                            continue;
                        }
                        self.emit(&RunnerEvent::GroupStart {
                            title: group.title.clone(),
                        });
                        let group_failed_before = self.summary.aggregates.failed;
                        for test in group.tests() {
                            self.run_test(test, suite).await;
                        }
                        self.emit(&RunnerEvent::GroupEnd {
                            title: group.title.clone(),
                            has_error: self.summary.aggregates.failed > group_failed_before,
                        });
                    }
                }
            }

            self.emit(&RunnerEvent::SuiteEnd {
                name: suite.name.clone(),
                has_error: self.summary.aggregates.failed > failed_before,
            });
        }
        self.suites = suites;
    }

    pub fn end(&mut self) {
        if let Some(started_at) = self.started_at {
            self.summary.duration_ms = started_at.elapsed().as_millis() as u64;
        }
        if self.cancel.is_cancelled() {
            self.summary.has_error = true;
        }
        self.emit(&RunnerEvent::RunnerEnd);

        let summary = self.summary.clone();
        for reporter in &mut self.reporters {
            reporter.end(&summary);
        }
    }

    pub fn get_summary(&self) -> RunSummary {
        self.summary.clone()
    }

    fn emit(&mut self, event: &RunnerEvent) {
        for reporter in &mut self.reporters {
            reporter.on_event(event);
        }
    }

    async fn run_test(&mut self, test: &Test, suite: &Suite) {
        if !self.refiner.allows(test) {
            return;
        }

        self.emit(&RunnerEvent::TestStart {
            title: test.title.clone(),
        });

        let retries = test.retries.unwrap_or(suite.retries);
        let mut node = TestEndNode {
            title: test.title.clone(),
            suite: suite.name.clone(),
            group: test.group.clone(),
            file: test.file.clone(),
            status: TestStatus::Passed,
            duration_ms: 0,
            retry_attempt: 1,
            retries,
            error: None,
        };

        match &test.body {
            None => node.status = TestStatus::Todo,
            Some(_) if self.cancel.is_cancelled() => node.status = TestStatus::Skipped,
            Some(body) => {
                let timeout = test.timeout.unwrap_or(suite.timeout);
                let started_at = Instant::now();
                let max_attempts = retries + 1;

                for attempt in 1..=max_attempts {
                    node.retry_attempt = attempt;
                    match self.run_attempt(body, test, timeout).await {
                        Ok(()) => {
                            node.status = TestStatus::Passed;
                            node.error = None;
                            break;
                        }
                        Err(error) => {
                            node.status = TestStatus::Failed;
                            node.error = Some(format!("{error:#}"));
                            if self.cancel.is_cancelled() {
                                break;
                            }
                            if attempt < max_attempts {
                                tracing::debug!(
                                    test = %test.title,
                                    attempt,
                                    retries,
                                    "retrying failed test"
                                );
                            }
                        }
                    }
                }
                node.duration_ms = started_at.elapsed().as_millis() as u64;
            }
        }

        self.record(&node);
        self.emit(&RunnerEvent::TestEnd(node));
    }

    async fn run_attempt(
        &self,
        body: &TestFn,
        test: &Test,
        timeout: Duration,
    ) -> anyhow::Result<()> {
        // Panics inside the body, including failed assertions, fail the attempt.
        let execution = AssertUnwindSafe(async { body().await })
            .catch_unwind()
            .map(|outcome| {
                outcome.unwrap_or_else(|payload| {
                    Err(anyhow::anyhow!(
                        t!("run.test_panicked", message = panic_message(&*payload))
                            .to_string()
                    ))
                })
            });
        let bounded = async {
            if timeout.is_zero() {
                return execution.await;
            }
            match tokio::time::timeout(timeout, execution).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!(
                    t!(
                        "run.test_timeout",
                        title = test.title,
                        timeout = timeout.as_millis()
                    )
                    .to_string()
                )),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                Err(anyhow::anyhow!(t!("run.test_cancelled").to_string()))
            }
            result = bounded => result,
        }
    }

    fn record(&mut self, node: &TestEndNode) {
        let aggregates = &mut self.summary.aggregates;
        aggregates.total += 1;
        match node.status {
            TestStatus::Passed => aggregates.passed += 1,
            TestStatus::Skipped => aggregates.skipped += 1,
            TestStatus::Todo => aggregates.todo += 1,
            TestStatus::Failed => {
                aggregates.failed += 1;
                self.summary.has_error = true;
                self.summary.failed_tests_titles.push(node.title.clone());
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("refiner", &self.refiner)
            .field("suites", &self.suites)
            .field("reporters", &self.reporters.len())
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn tagged(title: &str, tags: &[&str]) -> Test {
        Test::new(title).tags(tags.iter().copied())
    }

    #[test]
    fn refiner_without_filters_allows_everything() {
        let refiner = Refiner::new();
        assert!(refiner.allows(&Test::new("anything")));
    }

    #[test]
    fn refiner_negated_tags_exclude_tests() {
        let mut refiner = Refiner::new();
        refiner.add(FilterLayer::Tags, ["@fast", "!@slow"]);

        assert!(refiner.allows(&tagged("a", &["@fast"])));
        assert!(!refiner.allows(&tagged("b", &["@fast", "@slow"])));
        assert!(!refiner.allows(&tagged("c", &[])));
    }

    #[test]
    fn refiner_only_negated_tags_keeps_untagged_tests() {
        let mut refiner = Refiner::new();
        refiner.add(FilterLayer::Tags, ["!@slow"]);

        assert!(refiner.allows(&tagged("a", &[])));
        assert!(!refiner.allows(&tagged("b", &["@slow"])));
    }

    #[test]
    fn refiner_match_all_tags_requires_every_tag() {
        let mut refiner = Refiner::new();
        refiner
            .add(FilterLayer::Tags, ["@github", "@slow"])
            .match_all_tags(true);

        assert!(refiner.allows(&tagged("a", &["@github", "@slow"])));
        assert!(!refiner.allows(&tagged("b", &["@github"])));
    }

    #[test]
    fn refiner_groups_filter_excludes_ungrouped_tests() {
        let mut refiner = Refiner::new();
        refiner.add(FilterLayer::Groups, ["users"]);

        let mut group = Group::new("users");
        group.add(Test::new("creates a user"));

        assert!(refiner.allows(&group.tests()[0]));
        assert!(!refiner.allows(&Test::new("creates a user")));
    }

    #[tokio::test]
    async fn runner_retries_until_the_test_passes() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let test = Test::new("flaky").run(move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    anyhow::bail!("not yet");
                }
                Ok(())
            }
        });

        let mut suite = Suite::new("unit", Duration::from_secs(1), 2);
        suite.add_test(test);

        let mut runner = Runner::new(Refiner::new());
        runner.add(suite);
        runner.start();
        runner.exec().await;
        runner.end();

        let summary = runner.get_summary();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(summary.aggregates.passed, 1);
        assert!(!summary.has_error);
    }

    #[tokio::test]
    async fn runner_fails_tests_exceeding_the_timeout() {
        let test = Test::new("sleepy").run(|| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        });

        let mut suite = Suite::new("unit", Duration::from_millis(10), 0);
        suite.add_test(test).add_test(Test::new("later"));

        let mut runner = Runner::new(Refiner::new());
        runner.add(suite);
        runner.start();
        runner.exec().await;
        runner.end();

        let summary = runner.get_summary();
        assert_eq!(summary.aggregates.failed, 1);
        assert_eq!(summary.aggregates.todo, 1);
        assert_eq!(summary.failed_tests_titles, vec!["sleepy".to_string()]);
        assert!(summary.has_error);
    }

    #[tokio::test]
    async fn runner_contains_panicking_tests() {
        let mut suite = Suite::new("unit", Duration::from_secs(1), 0);
        suite
            .add_test(Test::new("panics").run(|| async {
                assert_eq!(1, 2, "numbers differ");
                Ok(())
            }))
            .add_test(Test::new("passes").run(|| async { Ok(()) }));

        let mut runner = Runner::new(Refiner::new());
        runner.add(suite);
        runner.start();
        runner.exec().await;
        runner.end();

        let summary = runner.get_summary();
        assert_eq!(summary.aggregates.failed, 1);
        assert_eq!(summary.aggregates.passed, 1);
        assert_eq!(summary.failed_tests_titles, vec!["panics".to_string()]);
        assert!(summary.has_error);
    }

    #[tokio::test]
    async fn panicking_attempts_are_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let test = Test::new("flaky panic").run(move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first attempt");
                }
                Ok(())
            }
        });

        let mut suite = Suite::new("unit", Duration::ZERO, 1);
        suite.add_test(test);

        let mut runner = Runner::new(Refiner::new());
        runner.add(suite);
        runner.start();
        runner.exec().await;
        runner.end();

        let summary = runner.get_summary();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(summary.aggregates.passed, 1);
        assert!(!summary.has_error);
    }

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }

    #[tokio::test]
    async fn runner_skips_tests_after_cancellation() {
        let token = CancellationToken::new();
        token.cancel();

        let mut suite = Suite::new("unit", Duration::ZERO, 0);
        suite.add_test(Test::new("never").run(|| async { Ok(()) }));

        let mut runner = Runner::new(Refiner::new()).with_cancellation(token);
        runner.add(suite);
        runner.start();
        runner.exec().await;
        runner.end();

        let summary = runner.get_summary();
        assert_eq!(summary.aggregates.skipped, 1);
        assert!(summary.has_error);
    }
}

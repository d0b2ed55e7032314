//! Fluent test-case configuration and concurrent execution.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinError;

use crate::config::Validate;
use crate::error::{Error, Result};
use crate::fixture::{populate, SourceFilter};
use crate::paths::{ensure_directory, find_project_root, DEFAULT_MARKER};
use crate::process::{
    run_invocation, Execution, ProcessExecutor, ProcessSpec, ShellExecutor, StderrPolicy,
};
use crate::signature::IntoArgs;

use super::plan::{expand, RunSpec};
use super::report::{aggregate, RunReport};

/// Caller check applied to every finished run.
///
/// Returning `Err` fails a run that would otherwise have passed.
pub type Expectation = Arc<dyn Fn(&RunReport) -> std::result::Result<(), String> + Send + Sync>;

/// Accumulated state of a [`TestCase`].
#[derive(Clone)]
pub struct TestCaseConfig {
    /// Directory holding fixture trees; the project root if unset.
    pub source_dir: Option<PathBuf>,
    /// Directory receiving working directories; the project root if unset.
    pub temp_dir: Option<PathBuf>,
    /// Program under test.
    pub program: Option<String>,
    /// Fixture names, in order. Empty means start from an empty directory.
    pub fixtures: Vec<String>,
    /// Which fixture files are copied.
    pub filter: SourceFilter,
    /// Caller checks, in order.
    pub expectations: Vec<Expectation>,
    /// Argument lists, one per way of invoking the program.
    pub invocations: Vec<Vec<String>>,
    /// Per-run timeout; runs may block forever when unset.
    pub timeout: Option<Duration>,
    /// Whether standard-error output fails a clean exit.
    pub stderr_policy: StderrPolicy,
    /// File that marks the project root.
    pub marker: String,
    /// Where project-root discovery starts; the current directory if unset.
    pub search_start: Option<PathBuf>,
    /// How programs are started.
    pub executor: Arc<dyn ProcessExecutor>,
}

impl Default for TestCaseConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            temp_dir: None,
            program: None,
            fixtures: Vec::new(),
            filter: SourceFilter::all(),
            expectations: Vec::new(),
            invocations: Vec::new(),
            timeout: None,
            stderr_policy: StderrPolicy::default(),
            marker: DEFAULT_MARKER.to_string(),
            search_start: None,
            executor: Arc::new(ShellExecutor::new()),
        }
    }
}

impl fmt::Debug for TestCaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCaseConfig")
            .field("source_dir", &self.source_dir)
            .field("temp_dir", &self.temp_dir)
            .field("program", &self.program)
            .field("fixtures", &self.fixtures)
            .field("filter", &self.filter)
            .field("expectations", &self.expectations.len())
            .field("invocations", &self.invocations)
            .field("timeout", &self.timeout)
            .field("stderr_policy", &self.stderr_policy)
            .field("marker", &self.marker)
            .field("search_start", &self.search_start)
            .field("executor", &self.executor.name())
            .finish()
    }
}

/// Builder for a black-box test of a command-line program.
///
/// Every setter consumes and returns the builder, so a configuration is
/// never shared between a parent and the cases derived from it with
/// [`TestCase::create`].
#[derive(Debug, Clone, Default)]
pub struct TestCase {
    pub(super) config: TestCaseConfig,
    baseline: Option<Arc<TestCaseConfig>>,
}

impl TestCase {
    /// Creates a test case with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    fn from_baseline(baseline: TestCaseConfig) -> Self {
        Self {
            config: baseline.clone(),
            baseline: Some(Arc::new(baseline)),
        }
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &TestCaseConfig {
        &self.config
    }

    /// Restores the configuration this case was created from, or the
    /// defaults if it was created with [`TestCase::new`].
    pub fn reset(mut self) -> Self {
        self.config = match &self.baseline {
            Some(baseline) => TestCaseConfig::clone(baseline),
            None => TestCaseConfig::default(),
        };
        self
    }

    /// Sets the fixture directory and the working-directory root.
    ///
    /// Relative paths are resolved against the project root.
    pub fn with_directories(mut self, source: impl Into<PathBuf>, temp: impl Into<PathBuf>) -> Self {
        self.config.source_dir = Some(source.into());
        self.config.temp_dir = Some(temp.into());
        self
    }

    /// Sets the program under test.
    pub fn for_program(mut self, program: impl Into<String>) -> Self {
        self.config.program = Some(program.into());
        self
    }

    /// Adds a fixture, named by its directory under the source directory.
    pub fn add_source(mut self, name: impl Into<String>) -> Self {
        self.config.fixtures.push(name.into());
        self
    }

    /// Replaces the filter deciding which fixture files are copied.
    pub fn with_source_filter(mut self, filter: SourceFilter) -> Self {
        self.config.filter = filter;
        self
    }

    /// Adds a check run against every finished run.
    pub fn add_expectation<F>(mut self, expectation: F) -> Self
    where
        F: Fn(&RunReport) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.config.expectations.push(Arc::new(expectation));
        self
    }

    /// Adds one way of invoking the program. Nested lists are flattened.
    pub fn add_invocation(mut self, args: impl IntoArgs) -> Self {
        self.config.invocations.push(args.into_args());
        self
    }

    /// Kills and fails any run that takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Sets how standard-error output is judged.
    pub fn with_stderr_policy(mut self, policy: StderrPolicy) -> Self {
        self.config.stderr_policy = policy;
        self
    }

    /// Sets the file name that marks the project root.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.marker = marker.into();
        self
    }

    /// Sets where project-root discovery starts.
    pub fn with_search_start(mut self, start: impl Into<PathBuf>) -> Self {
        self.config.search_start = Some(start.into());
        self
    }

    /// Replaces how programs are started.
    pub fn with_executor(mut self, executor: impl ProcessExecutor + 'static) -> Self {
        self.config.executor = Arc::new(executor);
        self
    }

    /// Derives an independent case seeded from the current configuration.
    ///
    /// Resetting the derived case restores this configuration.
    pub fn create(&self) -> TestCase {
        Self::from_baseline(self.config.clone())
    }

    /// Freezes this case; the result can only derive new cases.
    pub fn seal(self) -> SealedTestCase {
        SealedTestCase {
            config: Arc::new(self.config),
        }
    }

    /// Resolves directories and expands every (fixture, invocation) pair.
    ///
    /// Fails if the project root cannot be found or a base directory cannot
    /// be created.
    pub fn run_specs(&self) -> Result<Vec<RunSpec>> {
        let start = match &self.config.search_start {
            Some(start) => start.clone(),
            None => std::env::current_dir()?,
        };
        let root = find_project_root(&start, &self.config.marker)?;
        let sources = ensure_directory(&root, &optional_segment(&self.config.source_dir))?;
        let temps = ensure_directory(&root, &optional_segment(&self.config.temp_dir))?;

        Ok(expand(
            &self.config.fixtures,
            &self.config.invocations,
            &sources,
            &temps,
        ))
    }

    /// Executes every run concurrently and returns each report.
    ///
    /// Fails before starting anything if the configuration is invalid or
    /// the directories cannot be resolved. Individual run failures are
    /// carried in the reports.
    pub async fn run_all(&self) -> Result<Vec<RunReport>> {
        for warning in self.config.validate().into_result()? {
            tracing::warn!(warning = %warning, "test case configuration");
        }

        let specs = self.run_specs()?;
        if specs.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(
            program = self.config.program.as_deref().unwrap_or_default(),
            runs = specs.len(),
            "starting test case"
        );

        let config = Arc::new(self.config.clone());
        let handles: Vec<_> = specs
            .into_iter()
            .map(|spec| {
                let config = Arc::clone(&config);
                let task_spec = spec.clone();
                (spec, tokio::spawn(async move { execute_run(&config, task_spec).await }))
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (spec, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    let message = panic_message(e);
                    tracing::error!(signature = %spec.signature, error = %message, "run task failed");
                    RunReport {
                        spec,
                        outcome: Err(Error::Panicked(message)),
                        output: None,
                        duration: Duration::ZERO,
                    }
                }
            };
            reports.push(report);
        }

        let failed = reports.iter().filter(|r| !r.passed()).count();
        tracing::info!(runs = reports.len(), failed, "test case finished");
        Ok(reports)
    }

    /// Executes every run concurrently and folds the outcomes.
    ///
    /// With exactly one run its own result is returned. Otherwise the
    /// result is every working directory, or an aggregate error naming each
    /// failed run.
    pub async fn run(&self) -> Result<Vec<PathBuf>> {
        aggregate(self.run_all().await?)
    }
}

/// A frozen [`TestCase`] that can only derive new cases.
#[derive(Debug, Clone)]
pub struct SealedTestCase {
    config: Arc<TestCaseConfig>,
}

impl SealedTestCase {
    /// Derives an independent, configurable case from the sealed one.
    pub fn create(&self) -> TestCase {
        TestCase::from_baseline(TestCaseConfig::clone(&self.config))
    }
}

fn optional_segment(dir: &Option<PathBuf>) -> Vec<&Path> {
    dir.iter().map(PathBuf::as_path).collect()
}

async fn execute_run(config: &TestCaseConfig, spec: RunSpec) -> RunReport {
    let started = Instant::now();
    tracing::info!(
        signature = %spec.signature,
        fixture = spec.fixture.as_deref().unwrap_or("-"),
        "starting run"
    );

    let execution = match populate(spec.source.clone(), spec.work_dir.clone(), config.filter.clone())
        .await
    {
        Err(e) => Execution {
            result: Err(e),
            output: None,
        },
        Ok(()) => {
            let program = config.program.clone().unwrap_or_default();
            let process = ProcessSpec::new(program, spec.args.clone(), spec.work_dir.clone())
                .with_timeout(config.timeout);
            run_invocation(config.executor.as_ref(), &process, config.stderr_policy).await
        }
    };

    let mut report = RunReport {
        spec,
        outcome: execution.result,
        output: execution.output,
        duration: started.elapsed(),
    };
    check_expectations(&mut report, &config.expectations);

    match &report.outcome {
        Ok(_) => tracing::info!(
            signature = %report.spec.signature,
            duration = ?report.duration,
            "run passed"
        ),
        Err(e) => tracing::info!(
            signature = %report.spec.signature,
            duration = ?report.duration,
            error = %e,
            "run failed"
        ),
    }
    report
}

fn check_expectations(report: &mut RunReport, expectations: &[Expectation]) {
    for expectation in expectations {
        if let Err(message) = (**expectation)(&*report) {
            if report.outcome.is_ok() {
                report.outcome = Err(Error::Expectation {
                    signature: report.spec.signature.clone(),
                    message,
                });
            } else {
                tracing::debug!(
                    signature = %report.spec.signature,
                    message = %message,
                    "expectation failed on an already failed run"
                );
            }
        }
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => {
            if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            }
        }
        Err(err) => err.to_string(),
    }
}

//! Program execution and outcome classification.
//!
//! Execution is an injectable capability: the [`ProcessExecutor`] trait runs
//! a program and reports its exit code and output, while [`classify`] turns
//! that report into a pass/fail judgment. Tests can swap in a fake executor
//! without spawning real processes.

mod direct;
mod shell;

pub use direct::DirectExecutor;
pub use shell::ShellExecutor;

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{Error, Result};

/// Outcome of one run: the working directory on success.
pub type RunResult = Result<PathBuf>;

/// How standard-error output affects a run that exited cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StderrPolicy {
    /// Any standard-error output fails the run.
    #[default]
    Fail,
    /// Standard-error output is captured but does not fail the run.
    Ignore,
}

/// A single program invocation.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments passed after the program.
    pub args: Vec<String>,
    /// Working directory for the process.
    pub working_dir: PathBuf,
    /// Kill the process if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl ProcessSpec {
    /// Creates a spec with no timeout.
    pub fn new(program: impl Into<String>, args: Vec<String>, working_dir: PathBuf) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir,
            timeout: None,
        }
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The program followed by its arguments, joined by spaces.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a finished process reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, or `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ProcessOutput {
    /// Returns true if the process exited with code zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Capability to run a program to completion.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Runs the program described by `spec` and waits for it to exit.
    ///
    /// Returns an error only if the process could not be started or timed
    /// out; a non-zero exit is reported through [`ProcessOutput::code`].
    async fn execute(&self, spec: &ProcessSpec) -> Result<ProcessOutput>;

    /// Returns the name of this executor.
    fn name(&self) -> &str;
}

/// Judges a finished process.
///
/// A non-zero exit fails with the process error message. Otherwise any
/// standard-error text fails the run unless `policy` is
/// [`StderrPolicy::Ignore`]. Anything else succeeds with the working
/// directory.
pub fn classify(spec: &ProcessSpec, output: &ProcessOutput, policy: StderrPolicy) -> RunResult {
    if !output.success() {
        return Err(Error::ProcessFailed {
            command: spec.command_line(),
            code: output.code,
            stderr: output.stderr.clone(),
        });
    }

    if !output.stderr.is_empty() && policy == StderrPolicy::Fail {
        return Err(Error::Stderr {
            command: spec.command_line(),
            stderr: output.stderr.clone(),
        });
    }

    Ok(spec.working_dir.clone())
}

/// Result of running and classifying one invocation.
#[derive(Debug)]
pub struct Execution {
    /// The pass/fail judgment.
    pub result: RunResult,
    /// What the process reported, if it ran to completion.
    pub output: Option<ProcessOutput>,
}

/// Runs `spec` once through `executor` and classifies the outcome.
///
/// Failures are reported, never retried.
pub async fn run_invocation(
    executor: &dyn ProcessExecutor,
    spec: &ProcessSpec,
    policy: StderrPolicy,
) -> Execution {
    tracing::debug!(
        executor = executor.name(),
        command = %spec.command_line(),
        working_dir = ?spec.working_dir,
        "running invocation"
    );

    match executor.execute(spec).await {
        Ok(output) => {
            let result = classify(spec, &output, policy);
            if policy == StderrPolicy::Ignore && !output.stderr.is_empty() {
                tracing::warn!(
                    command = %spec.command_line(),
                    "ignoring standard error output"
                );
            }
            Execution {
                result,
                output: Some(output),
            }
        }
        Err(e) => Execution {
            result: Err(e),
            output: None,
        },
    }
}

/// Spawns `command`, waits for it, and captures its output.
///
/// The child is killed if `timeout` elapses first.
pub(crate) async fn collect_output(
    mut command: Command,
    spec: &ProcessSpec,
) -> Result<ProcessOutput> {
    let child = command
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::Launch {
            command: spec.command_line(),
            source: e,
        })?;

    let waited = match spec.timeout {
        Some(after) => tokio::time::timeout(after, child.wait_with_output())
            .await
            .map_err(|_| Error::Timeout {
                command: spec.command_line(),
                after,
            })?,
        None => child.wait_with_output().await,
    };
    let output = waited?;

    Ok(ProcessOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

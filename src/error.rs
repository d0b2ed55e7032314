//! Error types for the command-line test harness.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for harness operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No ancestor of the search start contains the project marker.
    #[error("no project root found above {start} (looked for {marker})")]
    ProjectRootNotFound { start: PathBuf, marker: String },

    /// IO error while preparing directories.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to copy a fixture tree into a working directory.
    #[error("failed to copy {source_dir} to {dest}: {reason}")]
    Copy {
        source_dir: PathBuf,
        dest: PathBuf,
        reason: String,
    },

    /// The program could not be started.
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The program exited unsuccessfully.
    #[error("Command failed: {command} ({})\n{stderr}", exit_description(.code))]
    ProcessFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The program exited cleanly but wrote to standard error.
    #[error("{stderr}")]
    Stderr { command: String, stderr: String },

    /// The program did not finish within the configured timeout.
    #[error("`{command}` timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    /// A caller expectation rejected the run.
    #[error("expectation failed for {signature}: {message}")]
    Expectation { signature: String, message: String },

    /// A run task panicked.
    #[error("run panicked: {0}")]
    Panicked(String),

    /// Invalid harness configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A case file could not be parsed.
    #[error("invalid case file: {0}")]
    CaseFile(String),

    /// One or more runs of a batch failed.
    #[error("{} of the runs failed:\n{}", .0.len(), FailureList(.0))]
    Aggregate(Vec<RunFailure>),
}

/// Identifies a failed run inside an aggregate failure.
#[derive(Debug)]
pub struct RunFailure {
    /// Signature (working directory name) of the run.
    pub signature: String,
    /// Fixture the run started from, if any.
    pub fixture: Option<String>,
    /// Arguments the program was invoked with.
    pub args: Vec<String>,
    /// Why the run failed.
    pub error: Error,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.signature, self.error)
    }
}

struct FailureList<'a>(&'a [RunFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}", failure)?;
        }
        Ok(())
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl Error {
    /// Returns true if this error aborts the whole batch rather than one run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ProjectRootNotFound { .. } | Error::Config(_) | Error::CaseFile(_)
        )
    }

    /// Returns the failures carried by an aggregate error.
    pub fn failures(&self) -> &[RunFailure] {
        match self {
            Error::Aggregate(failures) => failures,
            _ => &[],
        }
    }
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

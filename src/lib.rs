//! CLI Harness - black-box end-to-end tests for command-line programs
//!
//! This library runs a program as a real subprocess against isolated,
//! per-run working directories populated from fixture trees, and reports
//! success or failure for every (fixture, invocation) pair.

pub mod case;
pub mod config;
pub mod error;
pub mod fixture;
pub mod paths;
pub mod process;
pub mod signature;

pub use error::{Error, Result, RunFailure};

pub use case::{
    aggregate, CaseFile, Expectation, RunReport, RunSpec, SealedTestCase, TestCase,
    TestCaseConfig,
};
pub use config::{Validate, ValidationResult};
pub use fixture::SourceFilter;
pub use paths::{ensure_directory, find_project_root, DirResolver, DEFAULT_MARKER};
pub use process::{
    classify, run_invocation, DirectExecutor, ProcessExecutor, ProcessOutput, ProcessSpec,
    RunResult, ShellExecutor, StderrPolicy,
};
pub use signature::{escape_filename, run_signature, IntoArgs};

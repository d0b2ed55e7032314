//! Test-case building, expansion and execution.
//!
//! A [`TestCase`] accumulates fixtures and invocations, expands them into
//! one [`RunSpec`] per (fixture, invocation) pair, and runs them all
//! concurrently in isolated working directories.

pub mod builder;
pub mod file;
pub mod plan;
pub mod report;

pub use builder::{Expectation, SealedTestCase, TestCase, TestCaseConfig};
pub use file::CaseFile;
pub use plan::{directory_name, expand, expand_pairs, RunSpec};
pub use report::{aggregate, RunReport};

//! Test cases described in YAML files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fixture::SourceFilter;
use crate::process::StderrPolicy;

use super::builder::TestCase;

/// A test case loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseFile {
    /// Program under test.
    pub program: String,

    /// Description of what this case covers.
    #[serde(default)]
    pub description: String,

    /// Fixture directory, relative to the project root.
    #[serde(default)]
    pub source_dir: Option<PathBuf>,

    /// Working-directory root, relative to the project root.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Fixture names.
    #[serde(default)]
    pub sources: Vec<String>,

    /// Argument lists.
    #[serde(default)]
    pub invocations: Vec<Vec<String>>,

    /// Glob patterns of fixture files that are not copied.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Per-run timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,

    /// How standard-error output is judged.
    #[serde(default)]
    pub stderr: StderrPolicy,
}

impl CaseFile {
    /// Loads a case from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(Error::Io)?;
        Self::from_yaml(&content)
    }

    /// Parses a case from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::CaseFile(format!("failed to parse case: {}", e)))
    }

    /// Returns the timeout as a Duration.
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Builds a configured test case.
    pub fn into_test_case(self) -> Result<TestCase> {
        let timeout = self.timeout_duration();
        let mut case = TestCase::new()
            .for_program(self.program)
            .with_stderr_policy(self.stderr);

        case.config.source_dir = self.source_dir;
        case.config.temp_dir = self.temp_dir;

        if !self.exclude.is_empty() {
            case = case.with_source_filter(SourceFilter::exclude_globs(&self.exclude)?);
        }
        if let Some(timeout) = timeout {
            case = case.with_timeout(timeout);
        }
        for source in self.sources {
            case = case.add_source(source);
        }
        for invocation in self.invocations {
            case = case.add_invocation(invocation);
        }
        Ok(case)
    }
}

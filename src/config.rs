//! Configuration validation for test cases.
//!
//! Validates configuration before running to catch errors early.

use std::time::Duration;

use crate::case::plan::colliding_signatures;
use crate::case::TestCaseConfig;
use crate::error::{Error, Result};
use crate::process::StderrPolicy;

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Merges another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

impl Validate for TestCaseConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        match self.program.as_deref() {
            None => result.add_error("no program configured"),
            Some(program) if program.trim().is_empty() => {
                result.add_error("program cannot be empty")
            }
            Some(_) => {}
        }

        if self.marker.trim().is_empty() {
            result.add_error("project marker cannot be empty");
        }

        if self.stderr_policy == StderrPolicy::Ignore {
            result.add_warning("standard error output will not fail runs");
        }

        result.merge(validate_fixtures(&self.fixtures));
        result.merge(validate_runs(&self.fixtures, &self.invocations));
        result.merge(validate_timeout(self.timeout));
        result
    }
}

fn validate_fixtures(fixtures: &[String]) -> ValidationResult {
    let mut result = ValidationResult::default();
    for fixture in fixtures {
        if fixture.is_empty() {
            result.add_error("fixture name cannot be empty");
        } else if fixture.contains(['/', '\\']) || fixture == ".." || fixture == "." {
            result.add_error(format!(
                "fixture '{}' must be a simple directory name",
                fixture
            ));
        }
    }
    result
}

fn validate_runs(fixtures: &[String], invocations: &[Vec<String>]) -> ValidationResult {
    let mut result = ValidationResult::default();
    if invocations.is_empty() {
        result.add_warning("no invocations configured, nothing will run");
    }
    for (name, count) in colliding_signatures(fixtures, invocations) {
        result.add_warning(format!(
            "{} runs share the working directory '{}'",
            count, name
        ));
    }
    result
}

fn validate_timeout(timeout: Option<Duration>) -> ValidationResult {
    let mut result = ValidationResult::default();
    match timeout {
        Some(timeout) if timeout.is_zero() => result.add_error("timeout must be non-zero"),
        Some(timeout) if timeout < Duration::from_millis(100) => {
            result.add_warning("timeout under 100ms may kill programs before they start")
        }
        _ => {}
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> TestCaseConfig {
        TestCaseConfig {
            program: Some("tool".to_string()),
            invocations: vec![vec!["--version".to_string()]],
            ..Default::default()
        }
    }

    #[test]
    fn valid_config_passes() {
        let result = valid_config().validate();
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn missing_program_fails() {
        let config = TestCaseConfig {
            program: None,
            ..valid_config()
        };
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("no program")));
    }

    #[test]
    fn whitespace_program_fails() {
        let config = TestCaseConfig {
            program: Some("   ".to_string()),
            ..valid_config()
        };
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn nested_fixture_name_fails() {
        let config = TestCaseConfig {
            fixtures: vec!["a/b".to_string(), "..".to_string()],
            ..valid_config()
        };
        assert_eq!(config.validate().errors.len(), 2);
    }

    #[test]
    fn empty_invocations_warns() {
        let config = TestCaseConfig {
            invocations: vec![],
            ..valid_config()
        };
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("nothing will run")));
    }

    #[test]
    fn colliding_signatures_warn() {
        let config = TestCaseConfig {
            invocations: vec![
                vec!["a b".to_string()],
                vec!["a".to_string(), "b".to_string()],
            ],
            ..valid_config()
        };
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("'a.b'")));
    }

    #[test]
    fn ignored_stderr_warns() {
        let config = TestCaseConfig {
            stderr_policy: StderrPolicy::Ignore,
            ..valid_config()
        };
        assert_eq!(config.validate().warnings.len(), 1);
    }

    #[test]
    fn zero_timeout_fails() {
        let config = TestCaseConfig {
            timeout: Some(Duration::ZERO),
            ..valid_config()
        };
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn problems_from_every_check_are_reported_together() {
        let config = TestCaseConfig {
            program: None,
            fixtures: vec!["a/b".to_string()],
            invocations: vec![],
            timeout: Some(Duration::ZERO),
            ..valid_config()
        };
        let result = config.validate();
        assert_eq!(result.errors.len(), 3);
        assert!(result.warnings.iter().any(|w| w.contains("nothing will run")));
    }

    #[test]
    fn merge_combines_results() {
        let mut a = ValidationResult::default();
        a.add_error("e1");
        let mut b = ValidationResult::default();
        b.add_warning("w1");
        a.merge(b);
        assert_eq!(a.errors, ["e1"]);
        assert_eq!(a.warnings, ["w1"]);
    }

    #[test]
    fn validation_result_into_result_ok_on_valid() {
        let mut result = ValidationResult::default();
        result.add_warning("just a warning");
        let warnings = result.into_result().unwrap();
        assert_eq!(warnings, ["just a warning"]);
    }

    #[test]
    fn validation_result_into_result_err_on_invalid() {
        let mut result = ValidationResult::default();
        result.add_error("bad");
        result.add_error("worse");
        match result.into_result() {
            Err(Error::Config(msg)) => assert_eq!(msg, "bad; worse"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}

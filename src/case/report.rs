//! Per-run reports and their aggregation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result, RunFailure};
use crate::process::{ProcessOutput, RunResult};

use super::plan::RunSpec;

/// Everything known about one finished run.
#[derive(Debug)]
pub struct RunReport {
    /// The run that was executed.
    pub spec: RunSpec,
    /// Success with the working directory, or why the run failed.
    pub outcome: RunResult,
    /// What the program reported, if it ran to completion.
    pub output: Option<ProcessOutput>,
    /// Wall-clock time from population to classification.
    pub duration: Duration,
}

impl RunReport {
    /// Returns true if the run succeeded.
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The run's working directory, whether or not it succeeded.
    pub fn directory(&self) -> &Path {
        &self.spec.work_dir
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }

    /// Captured standard output, empty if the program never finished.
    pub fn stdout(&self) -> &str {
        self.output.as_ref().map(|o| o.stdout.as_str()).unwrap_or("")
    }

    /// Captured standard error, empty if the program never finished.
    pub fn stderr(&self) -> &str {
        self.output.as_ref().map(|o| o.stderr.as_str()).unwrap_or("")
    }

    fn into_failure(self) -> std::result::Result<PathBuf, RunFailure> {
        match self.outcome {
            Ok(dir) => Ok(dir),
            Err(error) => Err(RunFailure {
                signature: self.spec.signature,
                fixture: self.spec.fixture,
                args: self.spec.args,
                error,
            }),
        }
    }
}

/// Folds run reports into one outcome.
///
/// A single run yields its own result unchanged. Several runs succeed with
/// every working directory only if all of them succeeded; otherwise the
/// error lists every failed run.
pub fn aggregate(mut reports: Vec<RunReport>) -> Result<Vec<PathBuf>> {
    if reports.len() == 1 {
        if let Some(report) = reports.pop() {
            return report.outcome.map(|dir| vec![dir]);
        }
    }

    let mut dirs = Vec::with_capacity(reports.len());
    let mut failures = Vec::new();
    for report in reports {
        match report.into_failure() {
            Ok(dir) => dirs.push(dir),
            Err(failure) => failures.push(failure),
        }
    }

    if failures.is_empty() {
        Ok(dirs)
    } else {
        Err(Error::Aggregate(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(sig: &str, outcome: RunResult) -> RunReport {
        RunReport {
            spec: RunSpec {
                fixture: None,
                args: vec![sig.to_string()],
                signature: sig.to_string(),
                source: None,
                work_dir: PathBuf::from("/work").join(sig),
            },
            outcome,
            output: None,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn single_run_error_is_returned_unwrapped() {
        let err = aggregate(vec![report("a", Err(Error::Panicked("x".to_string())))])
            .unwrap_err();
        assert!(matches!(err, Error::Panicked(_)));
    }

    #[test]
    fn all_successes_yield_every_directory() {
        let dirs = aggregate(vec![
            report("a", Ok(PathBuf::from("/work/a"))),
            report("b", Ok(PathBuf::from("/work/b"))),
        ])
        .unwrap();
        assert_eq!(dirs, vec![PathBuf::from("/work/a"), PathBuf::from("/work/b")]);
    }

    #[test]
    fn any_failure_fails_the_batch_and_names_it() {
        let err = aggregate(vec![
            report("a", Ok(PathBuf::from("/work/a"))),
            report("b", Err(Error::Config("bad".to_string()))),
            report("c", Err(Error::Panicked("boom".to_string()))),
        ])
        .unwrap_err();

        let failed: Vec<_> = err.failures().iter().map(|f| f.signature.as_str()).collect();
        assert_eq!(failed, ["b", "c"]);
    }

    #[test]
    fn no_runs_is_an_empty_success() {
        assert!(aggregate(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn report_accessors_default_without_output() {
        let r = report("a", Ok(PathBuf::from("/work/a")));
        assert!(r.passed());
        assert_eq!(r.stdout(), "");
        assert_eq!(r.directory(), Path::new("/work/a"));
    }
}

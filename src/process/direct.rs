//! Executor that starts the program without a shell.

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::Result;

use super::{collect_output, ProcessExecutor, ProcessOutput, ProcessSpec};

/// Starts the program directly, passing each argument verbatim.
///
/// Unlike [`super::ShellExecutor`], arguments are never split or expanded.
#[derive(Debug, Clone, Default)]
pub struct DirectExecutor;

impl DirectExecutor {
    /// Creates a direct executor.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessExecutor for DirectExecutor {
    async fn execute(&self, spec: &ProcessSpec) -> Result<ProcessOutput> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        collect_output(command, spec).await
    }

    fn name(&self) -> &str {
        "direct"
    }
}

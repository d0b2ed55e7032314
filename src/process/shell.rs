//! Shell-based executor.

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::Result;

use super::{collect_output, ProcessExecutor, ProcessOutput, ProcessSpec};

/// Runs the command line through the platform shell.
///
/// The program and arguments are joined into one line and handed to the
/// shell, so quoting and redirection in arguments are interpreted.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    /// Shell binary.
    shell: String,
    /// Flag that makes the shell run a single command string.
    command_flag: String,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellExecutor {
    /// Creates an executor using `sh -c` (or `cmd /C` on Windows).
    pub fn new() -> Self {
        if cfg!(windows) {
            Self::with_shell("cmd", "/C")
        } else {
            Self::with_shell("sh", "-c")
        }
    }

    /// Creates an executor using a custom shell.
    pub fn with_shell(shell: impl Into<String>, command_flag: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            command_flag: command_flag.into(),
        }
    }
}

#[async_trait]
impl ProcessExecutor for ShellExecutor {
    async fn execute(&self, spec: &ProcessSpec) -> Result<ProcessOutput> {
        let mut command = Command::new(&self.shell);
        command.arg(&self.command_flag).arg(spec.command_line());
        collect_output(command, spec).await
    }

    fn name(&self) -> &str {
        "shell"
    }
}

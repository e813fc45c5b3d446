//! Process execution for bridge commands
//!
//! Every interaction with the outside world goes through [`CommandExecutor`].
//! The production implementation spawns real processes; tests substitute a
//! scripted executor that records the argument vectors it receives.

use std::fs::File;
use std::future::Future;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{AdbError, Result};

/// Outcome of a single command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the process exited with status zero
    pub success: bool,
    /// Stdout and stderr joined by a newline
    pub output: String,
}

impl CommandResult {
    pub fn new(success: bool, stdout: &str, stderr: &str) -> Self {
        Self {
            success,
            output: format!("{}\n{}", stdout, stderr),
        }
    }
}

/// Runs external commands given as literal argument vectors
pub trait CommandExecutor {
    /// Run `argv[0]` with the remaining elements as arguments.
    ///
    /// When `capture` is given, stdout is streamed into that file instead of
    /// being collected into [`CommandResult::output`]. A nonzero exit is not an
    /// error; it is reported through [`CommandResult::success`].
    fn execute(
        &self,
        argv: &[String],
        capture: Option<File>,
    ) -> impl Future<Output = Result<CommandResult>> + Send;
}

/// Executor that spawns real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for ProcessExecutor {
    async fn execute(&self, argv: &[String], capture: Option<File>) -> Result<CommandResult> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| AdbError::CommandFailed("Empty command".to_string()))?;

        debug!("Executing: {:?}", argv);

        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null()).stderr(Stdio::piped());
        match capture {
            Some(file) => cmd.stdout(Stdio::from(file)),
            None => cmd.stdout(Stdio::piped()),
        };

        // `output()` would re-pipe stdout and drop the capture file
        let output = cmd
            .spawn()
            .map_err(AdbError::Io)?
            .wait_with_output()
            .await
            .map_err(AdbError::Io)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        Ok(CommandResult::new(output.status.success(), &stdout, &stderr))
    }
}


#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_success_follows_exit_code_not_output() {
        let exec = ProcessExecutor::new();

        let result = exec.execute(&sh("echo error; exit 0"), None).await.unwrap();
        assert!(result.success);

        let result = exec.execute(&sh("echo fine; exit 3"), None).await.unwrap();
        assert!(!result.success);
        assert!(result.output.contains("fine"));
    }

    #[tokio::test]
    async fn test_output_joins_stdout_and_stderr() {
        let exec = ProcessExecutor::new();
        let result = exec
            .execute(&sh("printf out; printf err >&2"), None)
            .await
            .unwrap();
        assert_eq!(result.output, "out\nerr");
    }

    #[tokio::test]
    async fn test_capture_streams_stdout_into_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.bin");
        let file = File::create(&path).unwrap();

        let exec = ProcessExecutor::new();
        let result = exec
            .execute(&sh("printf payload; printf warn >&2"), Some(file))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output, "\nwarn");
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_arguments_are_not_shell_interpreted() {
        let exec = ProcessExecutor::new();
        let argv = vec!["echo".to_string(), "a | b; $HOME".to_string()];
        let result = exec.execute(&argv, None).await.unwrap();
        assert!(result.output.starts_with("a | b; $HOME\n"));
    }

    #[tokio::test]
    async fn test_empty_argv_is_rejected() {
        let exec = ProcessExecutor::new();
        assert!(matches!(
            exec.execute(&[], None).await,
            Err(AdbError::CommandFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let exec = ProcessExecutor::new();
        let argv = vec!["parrot-definitely-not-installed".to_string()];
        assert!(matches!(
            exec.execute(&argv, None).await,
            Err(AdbError::Io(_))
        ));
    }
}

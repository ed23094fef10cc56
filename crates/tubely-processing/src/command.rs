//! External media tool invocation.

use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

impl ToolError {
    /// Diagnostic output captured from the tool, if it ran to completion.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ToolError::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Captured output of a successful tool run
#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Run `program` with `args` and wait for it to exit.
///
/// The child is killed if it outlives `timeout` or if the returned future is
/// dropped. A non-zero exit status is an error carrying the tool's stderr.
pub async fn run_tool<I, S>(
    program: &str,
    args: I,
    timeout: Duration,
) -> Result<ToolOutput, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let start = std::time::Instant::now();

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(result) => result.map_err(|source| ToolError::Spawn {
            program: program.to_string(),
            source,
        })?,
        Err(_) => {
            tracing::warn!(
                program = %program,
                timeout_secs = timeout.as_secs(),
                "Media tool timed out"
            );
            return Err(ToolError::Timeout {
                program: program.to_string(),
                timeout,
            });
        }
    };

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        return Err(ToolError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr,
        });
    }

    tracing::debug!(
        program = %program,
        duration_ms = start.elapsed().as_millis(),
        stdout_bytes = output.stdout.len(),
        "Media tool finished"
    );

    Ok(ToolOutput {
        stdout: output.stdout,
        stderr,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let output = run_tool("sh", ["-c", "printf hello"], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.stdout, b"hello");
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let err = run_tool(
            "sh",
            ["-c", "echo 'moov atom not found' >&2; exit 1"],
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ToolError::Failed { .. }));
        assert_eq!(err.stderr(), Some("moov atom not found"));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = run_tool(
            "/nonexistent/tubely-ffprobe",
            ["-version"],
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let err = run_tool("sh", ["-c", "sleep 5"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }
}

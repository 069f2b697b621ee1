//! Bounded external process execution for tool handlers.
//!
//! Any tool that shells out goes through `run_command`, which enforces a
//! hard timeout and kills the child on expiry so a hung binary can never
//! hang the request that invoked it.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tracing::warn;

use crate::error::HubError;

/// Cap on captured stdout/stderr, to keep responses bounded.
const MAX_CAPTURED_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// Run `program` with `args` in `cwd`, failing with a timeout error (and a
/// killed child) if it does not finish within `timeout`.
pub async fn run_command(
    program: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
) -> Result<CommandOutput, HubError> {
    let started = std::time::Instant::now();

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| HubError::Handler(format!("failed to spawn '{}': {}", program, e)))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| HubError::Handler(e.to_string()))?,
        Err(_) => {
            // wait_with_output consumed the child; kill_on_drop already
            // reaped it when the future was dropped by the timeout.
            warn!(
                "Command '{}' exceeded {}s timeout and was killed",
                program,
                timeout.as_secs()
            );
            return Err(HubError::Handler(format!(
                "command '{}' timed out after {}s",
                program,
                timeout.as_secs()
            )));
        }
    };

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: truncate_utf8(output.stdout),
        stderr: truncate_utf8(output.stderr),
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

fn truncate_utf8(mut bytes: Vec<u8>) -> String {
    bytes.truncate(MAX_CAPTURED_BYTES);
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cwd() -> PathBuf {
        std::env::temp_dir()
    }

    #[tokio::test]
    async fn test_command_captures_stdout_and_exit_code() {
        let out = run_command("echo", &["hello"], &cwd(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_code_is_reported_not_error() {
        let out = run_command("false", &[], &cwd(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_ne!(out.exit_code, 0);
    }

    #[tokio::test]
    async fn test_hanging_command_times_out() {
        let started = std::time::Instant::now();
        let result = run_command("sleep", &["30"], &cwd(), Duration::from_millis(200)).await;

        let err = result.expect_err("should time out");
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_binary_is_handler_error() {
        let result = run_command(
            "definitely-not-a-binary-9461",
            &[],
            &cwd(),
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(HubError::Handler(_))));
    }
}

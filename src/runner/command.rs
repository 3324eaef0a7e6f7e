//! Runner that shells out to an external tool per role

use super::types::{Runner, RunnerError, TaskOutput, TaskRequest};
use crate::config::RoleConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Runner that executes a role's configured command
///
/// The step description is passed as the final argument, and stdout is
/// returned as the result payload.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    /// Command per role name
    commands: HashMap<String, String>,

    /// Default timeout when the request carries none
    timeout: Duration,
}

impl CommandRunner {
    /// Build from configured roles; roles without a command are skipped
    pub fn from_roles(roles: &HashMap<String, RoleConfig>, timeout: Duration) -> Self {
        let commands = roles
            .iter()
            .filter_map(|(name, role)| role.command.clone().map(|c| (name.clone(), c)))
            .collect();

        Self { commands, timeout }
    }

    /// Create with explicit role commands
    pub fn new(commands: HashMap<String, String>, timeout: Duration) -> Self {
        Self { commands, timeout }
    }

    fn command_for(&self, role: &str) -> Result<&str, RunnerError> {
        self.commands
            .get(role)
            .map(String::as_str)
            .ok_or_else(|| RunnerError::Config {
                message: format!("no command configured for role '{}'", role),
            })
    }
}

#[async_trait]
impl Runner for CommandRunner {
    async fn execute(&self, request: &TaskRequest) -> Result<TaskOutput, RunnerError> {
        let start = Instant::now();
        let timeout = request.timeout.unwrap_or(self.timeout);
        let command = self.command_for(&request.role)?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(format!("{} \"$1\"", command))
            .arg(command)
            .arg(&request.description)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if let Some(ref dir) = request.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| RunnerError::spawn(format!("failed to spawn '{}': {}", command, e)))?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let wait = async {
            // Drain both pipes concurrently; a child that fills one
            // pipe before closing the other must not stall the read
            let (stdout, stderr) = tokio::try_join!(read_pipe(stdout_pipe), read_pipe(stderr_pipe))
                .map_err(|e| RunnerError::spawn(format!("failed to read output: {}", e)))?;

            let status = child
                .wait()
                .await
                .map_err(|e| RunnerError::spawn(format!("failed to wait: {}", e)))?;

            if status.success() {
                Ok(stdout.trim().to_string())
            } else {
                Err(RunnerError::execution_failed(
                    status.code(),
                    stdout.trim().to_string(),
                    stderr.trim().to_string(),
                ))
            }
        };

        let outcome = tokio::time::timeout(timeout, wait).await;
        match outcome {
            Ok(Ok(payload)) => Ok(TaskOutput::new(payload, "command".into(), start.elapsed())),
            Ok(Err(e)) => {
                // Kill and reap child to prevent zombie process
                let _ = child.kill().await;
                let _ = child.wait().await;
                Err(e)
            }
            Err(_) => {
                // Timeout - the child must not outlive the step
                let _ = child.kill().await;
                let _ = child.wait().await;
                Err(RunnerError::timeout(start.elapsed()))
            }
        }
    }

    fn name(&self) -> &str {
        "command"
    }
}

async fn read_pipe<R>(pipe: Option<R>) -> std::io::Result<String>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = String::new();
    if let Some(mut reader) = pipe {
        reader.read_to_string(&mut buf).await?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_runner() -> CommandRunner {
        let mut commands = HashMap::new();
        commands.insert("echoer".into(), "echo".into());
        commands.insert("failer".into(), "false".into());
        CommandRunner::new(commands, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_command_success() {
        let runner = echo_runner();
        let request = TaskRequest::new("greet", "echoer").with_description("hello world");

        let output = runner.execute(&request).await.unwrap();
        assert!(output.payload.contains("hello world"));
        assert_eq!(output.runner, "command");
    }

    #[tokio::test]
    async fn test_command_failure() {
        let runner = echo_runner();
        let request = TaskRequest::new("fail", "failer");

        let result = runner.execute(&request).await;
        assert!(matches!(
            result,
            Err(RunnerError::ExecutionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_role() {
        let runner = echo_runner();
        let request = TaskRequest::new("x", "nonexistent");

        let result = runner.execute(&request).await;
        assert!(matches!(result, Err(RunnerError::Config { .. })));
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut commands = HashMap::new();
        commands.insert("slow".into(), "sleep 5; echo".into());
        let runner = CommandRunner::new(commands, Duration::from_millis(50));

        let request = TaskRequest::new("slow-step", "slow");
        let result = runner.execute(&request).await;
        assert!(matches!(result, Err(RunnerError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut commands = HashMap::new();
        commands.insert("slow".into(), "sleep 1; touch marker; echo".into());
        let runner = CommandRunner::new(commands, Duration::from_millis(100));

        let request = TaskRequest::new("slow-step", "slow")
            .with_working_dir(dir.path().to_path_buf());
        let result = runner.execute(&request).await;
        assert!(matches!(result, Err(RunnerError::Timeout { .. })));

        // Give an orphaned child time to finish its work if one survived
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn test_large_stderr_does_not_stall() {
        let mut commands = HashMap::new();
        // Well past the pipe buffer, written before stdout closes
        commands.insert(
            "noisy".into(),
            "head -c 131072 /dev/zero | tr '\\0' x >&2; exit 3; echo".into(),
        );
        let runner = CommandRunner::new(commands, Duration::from_secs(5));

        let request = TaskRequest::new("noisy-step", "noisy");
        let result = runner.execute(&request).await;
        match result {
            Err(RunnerError::ExecutionFailed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(3));
                assert!(stderr.len() >= 131072);
            }
            other => panic!("expected ExecutionFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_output_still_captured() {
        let mut commands = HashMap::new();
        commands.insert("grumbler".into(), "echo oops >&2; exit 2; echo".into());
        let runner = CommandRunner::new(commands, Duration::from_secs(5));

        let request = TaskRequest::new("grumble", "grumbler");
        let result = runner.execute(&request).await;
        match result {
            Err(RunnerError::ExecutionFailed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(2));
                assert_eq!(stderr, "oops");
            }
            other => panic!("expected ExecutionFailed, got {:?}", other),
        }
    }
}
